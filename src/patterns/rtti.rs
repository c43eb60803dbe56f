use crate::net::{self, HttpClient};
use crate::patterns::{Pattern, Route, RouteLookupError, RouteProvider};

use log::debug;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

/// Route as returned by `GET /routes/{routeNo}` of the RTTI API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RttiRoute {
    route_no: String,
    name: String,
    operating_company: String,
    #[serde(default)]
    patterns: Vec<RttiPattern>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RttiPattern {
    pattern_no: String,
    destination: String,
    route_map: RttiRouteMap,
    direction: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RttiRouteMap {
    href: String,
}

/// Error body of the RTTI API, e.g. `{"Code":"4004","Message":"Route not found"}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RttiError {
    code: String,
    message: String,
}

impl From<RttiRoute> for Route {
    fn from(route: RttiRoute) -> Route {
        Route {
            route_no: route.route_no,
            name: route.name,
            operating_company: route.operating_company,
            patterns: route
                .patterns
                .into_iter()
                .map(|p| Pattern {
                    pattern_no: p.pattern_no,
                    direction: p.direction,
                    destination: p.destination,
                    map_reference: p.route_map.href,
                })
                .collect(),
        }
    }
}

/// Route information provider backed by the TransLink RTTI API.
pub struct RttiClient<'a> {
    http: &'a HttpClient,
    base: Url,
    api_key: String,
}

impl<'a> RttiClient<'a> {
    pub fn new(http: &'a HttpClient, base: &str, api_key: &str) -> Result<Self, RouteLookupError> {
        let base = Url::parse(base).map_err(|e| RouteLookupError::BaseUrl(format!("{}: {}", base, e)))?;
        if base.cannot_be_a_base() {
            return Err(RouteLookupError::BaseUrl(base.to_string()));
        }
        Ok(RttiClient {
            http,
            base,
            api_key: api_key.to_owned(),
        })
    }

    /// URL of the route resource, without the API key.
    pub fn route_url(&self, route_no: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("routes").push(route_no);
        }
        url
    }
}

impl RouteProvider for RttiClient<'_> {
    fn lookup(&self, route_no: &str) -> Result<Route, RouteLookupError> {
        let display_url = self.route_url(route_no);
        debug!("Looking up route {} at {}", route_no, display_url);

        let mut url = display_url.clone();
        url.query_pairs_mut().append_pair("apikey", &self.api_key);

        let resp = self.http.send(display_url.as_str(), |client| {
            client
                .get(url.clone())
                .header(ACCEPT, "application/json")
        })?;
        let status = resp.status();
        let body = resp.bytes().map_err(|e| {
            RouteLookupError::Http(net::Error::Http {
                url: display_url.to_string(),
                source: e,
            })
        })?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<RttiError>(&body) {
                Ok(err) => RouteLookupError::Api {
                    route_no: route_no.to_owned(),
                    code: err.code,
                    message: err.message,
                },
                Err(_) => RouteLookupError::Http(net::Error::Status {
                    url: display_url.to_string(),
                    status,
                }),
            });
        }

        parse_route(route_no, &body)
    }
}

fn parse_route(route_no: &str, body: &[u8]) -> Result<Route, RouteLookupError> {
    serde_json::from_slice::<RttiRoute>(body)
        .map(Route::from)
        .map_err(|e| RouteLookupError::Decode {
            route_no: route_no.to_owned(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_parse_route() {
        let body = br#"{
            "RouteNo": "099",
            "Name": "COMMERCIAL-BROADWAY/UBC (B-LINE)      ",
            "OperatingCompany": "CMBC",
            "Patterns": [
                {
                    "PatternNo": "E5TB1",
                    "Destination": "UBC",
                    "RouteMap": {"Href": "https://nb.translink.ca/geodata/trip/099-E5TB1.kmz"},
                    "Direction": "WEST"
                },
                {
                    "PatternNo": "E5TA1",
                    "Destination": "COMM'L-BDWY STN",
                    "RouteMap": {"Href": "https://nb.translink.ca/geodata/trip/099-E5TA1.kmz"},
                    "Direction": "EAST"
                }
            ]
        }"#;

        let route = parse_route("099", body).unwrap();
        assert_eq!(route.route_no, "099");
        assert_eq!(route.operating_company, "CMBC");
        assert_eq!(route.patterns.len(), 2);
        assert_eq!(route.patterns[1].pattern_no, "E5TA1");
        assert_eq!(route.patterns[1].direction, "EAST");
        assert_eq!(
            route.patterns[0].map_reference,
            "https://nb.translink.ca/geodata/trip/099-E5TB1.kmz"
        );
    }

    #[test]
    fn test_parse_route_rejects_garbage() {
        assert!(matches!(
            parse_route("099", b"<html></html>"),
            Err(RouteLookupError::Decode { .. })
        ));
    }

    #[test]
    fn test_route_url() {
        let http = HttpClient::new(&Config::default()).unwrap();
        let rtti = RttiClient::new(&http, "https://api.translink.ca/rttiapi/v1/", "secret").unwrap();
        assert_eq!(
            rtti.route_url("R4").as_str(),
            "https://api.translink.ca/rttiapi/v1/routes/R4"
        );
        assert!(RttiClient::new(&http, "not a url", "secret").is_err());
    }

    #[test]
    fn test_connection_refused_is_a_transport_error() {
        let config = Config {
            max_retries: 1,
            timeout_secs: 5,
            ..Config::default()
        };
        let http = HttpClient::new(&config).unwrap();
        let rtti = RttiClient::new(&http, "http://127.0.0.1:1/rttiapi/v1", "secret").unwrap();

        assert!(matches!(
            rtti.lookup("099"),
            Err(RouteLookupError::Http(net::Error::Http { .. }))
        ));
    }
}
