//! Route pattern maps: for every route number of the GTFS feed, look up the
//! route's patterns, download each pattern's KMZ map and write it out as a
//! GeoJSON feature.

pub mod headsigns;
pub mod rtti;

use crate::error::Error;
use crate::geojson;
use crate::gtfs::{error::Error as GtfsError, rows::RowSource, structs};
use crate::kmz;
use crate::net::{self, Fetched, Fetcher};
use crate::sink::FileSink;
use headsigns::{HeadsignRow, HeadsignWriter};

use log::{error, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const ROUTE_PATTERNS_DIR: &str = "route-patterns";
pub const MISSING_PATTERN_TEXT: &str = "Pattern could not be retrieved.";

/// Route maps are served as `application/vnd.google-earth.kmz`
const KMZ_CONTENT_TYPE_SUFFIX: &str = ".kmz";

/// A route as known by the route information service.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub route_no: String,
    pub name: String,
    pub operating_company: String,
    pub patterns: Vec<Pattern>,
}

/// A directional variant of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub pattern_no: String,
    pub direction: String,
    pub destination: String,
    /// URL of the KMZ route map
    pub map_reference: String,
}

impl Pattern {
    fn file_stem(&self, route_no: &str) -> String {
        format!("{}-{}-{}", route_no, self.direction, self.pattern_no)
    }
}

/// An error that can occur when looking up a route.
#[derive(thiserror::Error, Debug)]
pub enum RouteLookupError {
    /// The service answered with an error document. The route is skipped.
    #[error("route {route_no}: {message} (code {code})")]
    Api {
        route_no: String,
        code: String,
        message: String,
    },
    /// The service could not be reached. The crawl stops.
    #[error(transparent)]
    Http(#[from] net::Error),
    /// The answer is not a route
    #[error("route {route_no}: unexpected response")]
    Decode {
        route_no: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid route information base url {0}")]
    BaseUrl(String),
}

/// Looks up a route by its short name.
pub trait RouteProvider {
    fn lookup(&self, route_no: &str) -> Result<Route, RouteLookupError>;
}

/// What happened to one pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternOutcome {
    /// GeoJSON feature written, headsign recorded
    Written(PathBuf),
    /// The map was not a KMZ, a `.missing` placeholder was written
    Placeholder(PathBuf),
    /// The KMZ could not be decoded, nothing was written
    DecodeFailed,
}

/// Counters of a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub routes: usize,
    pub skipped_routes: usize,
    pub patterns: usize,
    pub placeholders: usize,
    pub decode_failures: usize,
}

impl CrawlSummary {
    pub fn print_stats(&self) {
        info!("Route patterns:");
        info!("  Routes: {}", self.routes);
        info!("  Skipped routes: {}", self.skipped_routes);
        info!("  Patterns written: {}", self.patterns);
        info!("  Missing patterns: {}", self.placeholders);
        info!("  Undecodable patterns: {}", self.decode_failures);
    }
}

/// Distinct `route_short_name`s of `routes.csv`, sorted.
pub fn route_numbers(source: &RowSource) -> Result<Vec<String>, GtfsError> {
    let mut numbers = BTreeSet::new();
    for route in source.records::<structs::Route>()? {
        numbers.insert(route?.route_short_name);
    }
    Ok(numbers.into_iter().collect())
}

/// Fails with [`Error::UnexpectedContentType`] unless the response is a KMZ.
pub fn check_content_type(url: &str, fetched: &Fetched) -> Result<(), Error> {
    let mime = fetched
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    if mime.ends_with(KMZ_CONTENT_TYPE_SUFFIX) {
        Ok(())
    } else {
        Err(Error::UnexpectedContentType {
            url: url.to_owned(),
            content_type: fetched.content_type.clone(),
        })
    }
}

/// Walks routes and their patterns, one at a time.
pub struct PatternCrawler<'a, P, F> {
    provider: &'a P,
    fetcher: &'a F,
    sink: &'a FileSink,
}

impl<'a, P, F> PatternCrawler<'a, P, F>
where
    P: RouteProvider,
    F: Fetcher,
{
    pub fn new(provider: &'a P, fetcher: &'a F, sink: &'a FileSink) -> Self {
        PatternCrawler {
            provider,
            fetcher,
            sink,
        }
    }

    /// Rebuilds the `route-patterns` tree and `route_headsign_info.csv` for
    /// the given route numbers, in order.
    ///
    /// A route the service answers for but cannot describe is skipped.
    /// Transport failures of the lookup, fetch and I/O errors abort the crawl.
    pub fn run(&self, route_numbers: &[String]) -> Result<CrawlSummary, Error> {
        self.sink.clear(ROUTE_PATTERNS_DIR)?;
        let mut headsigns = HeadsignWriter::create(self.sink)?;
        let mut summary = CrawlSummary::default();

        for route_no in route_numbers {
            let route = match self.provider.lookup(route_no) {
                Ok(route) => route,
                Err(RouteLookupError::Http(e)) => return Err(e.into()),
                Err(e) => {
                    warn!("Route {} failed: {}", route_no, e);
                    summary.skipped_routes += 1;
                    continue;
                }
            };
            summary.routes += 1;

            let dir = PathBuf::from(ROUTE_PATTERNS_DIR).join(&route.route_no);
            self.sink.ensure_dir(&dir)?;

            for pattern in &route.patterns {
                info!(
                    "{} - {} - {}",
                    route.route_no, pattern.destination, pattern.pattern_no
                );
                match self.process_pattern(&route, pattern, &dir, &mut headsigns)? {
                    PatternOutcome::Written(_) => summary.patterns += 1,
                    PatternOutcome::Placeholder(_) => summary.placeholders += 1,
                    PatternOutcome::DecodeFailed => summary.decode_failures += 1,
                }
            }
        }
        Ok(summary)
    }

    fn process_pattern(
        &self,
        route: &Route,
        pattern: &Pattern,
        dir: &Path,
        headsigns: &mut HeadsignWriter,
    ) -> Result<PatternOutcome, Error> {
        let stem = pattern.file_stem(&route.route_no);
        let fetched = self.fetcher.fetch(&pattern.map_reference)?;

        if let Err(e) = check_content_type(&pattern.map_reference, &fetched) {
            info!("{}. Writing 'missing' placeholder", e);
            let path = self
                .sink
                .write_text(dir.join(format!("{}.missing", stem)), MISSING_PATTERN_TEXT)?;
            return Ok(PatternOutcome::Placeholder(path));
        }

        let track = match kmz::decode(&fetched.bytes) {
            Ok(track) => track,
            Err(e) => {
                error!(
                    "Could not decode {} for route {} pattern {}: {}",
                    pattern.map_reference, route.route_no, pattern.pattern_no, e
                );
                return Ok(PatternOutcome::DecodeFailed);
            }
        };

        let feature = geojson::route_pattern_feature(&track, route, pattern);
        let path = self
            .sink
            .write_json(dir.join(format!("{}.geojson", stem)), &feature)?;

        headsigns.append(&HeadsignRow {
            route_number: route.route_no.clone(),
            pattern_number: pattern.pattern_no.clone(),
            direction: pattern.direction.clone(),
            destination: pattern.destination.clone(),
        })?;
        Ok(PatternOutcome::Written(path))
    }
}

/// Crawls every route number of `routes.csv`.
pub fn build_route_patterns<P, F>(
    routes: &RowSource,
    provider: &P,
    fetcher: &F,
    sink: &FileSink,
) -> Result<CrawlSummary, Error>
where
    P: RouteProvider,
    F: Fetcher,
{
    let numbers = route_numbers(routes)?;
    info!("{} route numbers", numbers.len());
    PatternCrawler::new(provider, fetcher, sink).run(&numbers)
}

#[cfg(test)]
mod tests {
    use super::headsigns::ROUTE_HEADSIGN_INFO;
    use super::*;
    use crate::kmz::tests::{kmz, route_map_kml};
    use crate::kmz::DOC_KML;
    use crate::test_util::scratch_dir;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const KMZ_TYPE: &str = "application/vnd.google-earth.kmz";

    struct FakeProvider {
        routes: HashMap<String, Route>,
        calls: RefCell<Vec<String>>,
    }

    impl RouteProvider for FakeProvider {
        fn lookup(&self, route_no: &str) -> Result<Route, RouteLookupError> {
            self.calls.borrow_mut().push(route_no.to_string());
            self.routes
                .get(route_no)
                .cloned()
                .ok_or_else(|| RouteLookupError::Api {
                    route_no: route_no.to_string(),
                    code: "4004".to_string(),
                    message: "Route not found".to_string(),
                })
        }
    }

    struct FakeFetcher {
        responses: HashMap<String, Fetched>,
    }

    impl Fetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Fetched, net::Error> {
            Ok(self.responses[url].clone())
        }
    }

    fn pattern(no: &str, direction: &str) -> Pattern {
        Pattern {
            pattern_no: no.to_string(),
            direction: direction.to_string(),
            destination: "UBC".to_string(),
            map_reference: format!("https://maps.example/{}.kmz", no),
        }
    }

    fn route(no: &str, patterns: Vec<Pattern>) -> Route {
        Route {
            route_no: no.to_string(),
            name: format!("ROUTE {}  ", no),
            operating_company: "CMBC".to_string(),
            patterns,
        }
    }

    fn kmz_response() -> Fetched {
        Fetched {
            content_type: KMZ_TYPE.to_string(),
            bytes: kmz(&[(DOC_KML, &route_map_kml("ff0000ff"))]),
        }
    }

    fn html_response() -> Fetched {
        Fetched {
            content_type: "text/html".to_string(),
            bytes: b"<html></html>".to_vec(),
        }
    }

    #[test]
    fn test_failed_lookup_is_skipped() {
        let sink = FileSink::new(scratch_dir("patterns-lookup"));
        let provider = FakeProvider {
            routes: HashMap::from([("100".to_string(), route("100", vec![pattern("A1", "EAST")]))]),
            calls: RefCell::new(vec![]),
        };
        let fetcher = FakeFetcher {
            responses: HashMap::from([("https://maps.example/A1.kmz".to_string(), kmz_response())]),
        };

        let summary = PatternCrawler::new(&provider, &fetcher, &sink)
            .run(&["099".to_string(), "100".to_string()])
            .unwrap();

        assert_eq!(*provider.calls.borrow(), vec!["099", "100"]);
        assert_eq!(summary.skipped_routes, 1);
        assert_eq!(summary.patterns, 1);
        assert!(!sink.path("route-patterns/099").exists());

        let written = sink.path("route-patterns/100/100-EAST-A1.geojson");
        let feature: serde_json::Value =
            serde_json::from_slice(&std::fs::read(written).unwrap()).unwrap();
        assert_eq!(feature["properties"]["route-name"], "ROUTE 100");
        assert_eq!(feature["properties"]["stroke"], "#0000ff");
        assert_eq!(feature["properties"]["direction"], "EAST");

        let headsigns = std::fs::read_to_string(sink.path(ROUTE_HEADSIGN_INFO)).unwrap();
        assert_eq!(
            headsigns,
            "route_number,pattern_number,direction,destination\r\n100,A1,EAST,UBC\r\n"
        );
    }

    #[test]
    fn test_non_kmz_writes_placeholder() {
        let sink = FileSink::new(scratch_dir("patterns-placeholder"));
        let provider = FakeProvider {
            routes: HashMap::from([(
                "099".to_string(),
                route("099", vec![pattern("B1", "WEST"), pattern("B2", "EAST")]),
            )]),
            calls: RefCell::new(vec![]),
        };
        let fetcher = FakeFetcher {
            responses: HashMap::from([
                ("https://maps.example/B1.kmz".to_string(), html_response()),
                ("https://maps.example/B2.kmz".to_string(), kmz_response()),
            ]),
        };

        let summary = PatternCrawler::new(&provider, &fetcher, &sink)
            .run(&["099".to_string()])
            .unwrap();

        assert_eq!(summary.placeholders, 1);
        assert_eq!(summary.patterns, 1);
        let placeholder = sink.path("route-patterns/099/099-WEST-B1.missing");
        assert_eq!(
            std::fs::read_to_string(placeholder).unwrap(),
            MISSING_PATTERN_TEXT
        );
        assert!(!sink.path("route-patterns/099/099-WEST-B1.geojson").exists());

        let headsigns = std::fs::read_to_string(sink.path(ROUTE_HEADSIGN_INFO)).unwrap();
        assert_eq!(headsigns.lines().count(), 2);
        assert!(!headsigns.contains("B1"));
    }

    #[test]
    fn test_undecodable_kmz_is_skipped() {
        let sink = FileSink::new(scratch_dir("patterns-decode"));
        let provider = FakeProvider {
            routes: HashMap::from([("R4".to_string(), route("R4", vec![pattern("C1", "WEST")]))]),
            calls: RefCell::new(vec![]),
        };
        let fetcher = FakeFetcher {
            responses: HashMap::from([(
                "https://maps.example/C1.kmz".to_string(),
                Fetched {
                    content_type: KMZ_TYPE.to_string(),
                    bytes: kmz(&[("other.kml", "<kml/>")]),
                },
            )]),
        };

        let summary = PatternCrawler::new(&provider, &fetcher, &sink)
            .run(&["R4".to_string()])
            .unwrap();

        assert_eq!(summary.decode_failures, 1);
        assert_eq!(
            std::fs::read_dir(sink.path("route-patterns/R4")).unwrap().count(),
            0
        );
    }

    struct Unreachable;

    impl RouteProvider for Unreachable {
        fn lookup(&self, route_no: &str) -> Result<Route, RouteLookupError> {
            Err(RouteLookupError::Http(net::Error::Status {
                url: format!("https://api.example/routes/{}", route_no),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            }))
        }
    }

    #[test]
    fn test_unreachable_provider_aborts_crawl() {
        let sink = FileSink::new(scratch_dir("patterns-unreachable"));
        let fetcher = FakeFetcher {
            responses: HashMap::new(),
        };

        let result = PatternCrawler::new(&Unreachable, &fetcher, &sink)
            .run(&["099".to_string(), "100".to_string()]);

        assert!(matches!(
            result,
            Err(Error::NetError(net::Error::Status { status, .. }))
                if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[test]
    fn test_crawl_clears_previous_output() {
        let sink = FileSink::new(scratch_dir("patterns-clear"));
        sink.write_text("route-patterns/014/014-EAST-X.geojson", "{}").unwrap();
        let provider = FakeProvider {
            routes: HashMap::new(),
            calls: RefCell::new(vec![]),
        };
        let fetcher = FakeFetcher {
            responses: HashMap::new(),
        };

        PatternCrawler::new(&provider, &fetcher, &sink)
            .run(&["014".to_string()])
            .unwrap();

        assert!(!sink.path("route-patterns/014").exists());
    }

    #[test]
    fn test_route_numbers_are_sorted_and_distinct() {
        let dir = scratch_dir("patterns-route-numbers");
        std::fs::write(
            dir.join("routes.csv"),
            "route_id,agency_id,route_short_name,route_long_name\n\
             6612,CMBC,099 ,Commercial-Broadway/UBC\n\
             6613,CMBC,014,Hastings/UBC\n\
             6614,CMBC,099,Commercial-Broadway/UBC\n",
        )
        .unwrap();

        let numbers = route_numbers(&RowSource::in_dir(&dir, "routes.csv")).unwrap();
        assert_eq!(numbers, vec!["014", "099"]);
    }

    #[test]
    fn test_content_type_with_parameters() {
        let fetched = Fetched {
            content_type: "application/vnd.google-earth.kmz; charset=binary".to_string(),
            bytes: vec![],
        };
        assert!(check_content_type("u", &fetched).is_ok());
        assert!(matches!(
            check_content_type("u", &html_response()),
            Err(Error::UnexpectedContentType { .. })
        ));
    }
}
