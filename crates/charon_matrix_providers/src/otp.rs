//! Client for an OpenTripPlanner `plan` endpoint.

use jiff::civil::DateTime;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Incomplete response")]
    IncompleteResponse,
}

pub struct OtpClientParams {
    pub url: String,
    pub router: String,
}

#[derive(Debug, Clone)]
pub struct ItineraryRequest {
    pub from: geo::Point,
    pub to: geo::Point,
    pub time: DateTime,
    pub arrive_by: bool,
    pub modes: Vec<String>,
    pub num_itineraries: Option<usize>,
    pub max_walk_distance: Option<f64>,
}

impl ItineraryRequest {
    pub fn new(from: geo::Point, to: geo::Point, time: DateTime) -> Self {
        Self {
            from,
            to,
            time,
            arrive_by: false,
            modes: vec![
                String::from("WALK"),
                String::from("CAR"),
                String::from("TRANSIT"),
            ],
            num_itineraries: None,
            max_walk_distance: None,
        }
    }
}

#[derive(Deserialize)]
struct PlanResponse {
    plan: Option<Plan>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Plan {
    itineraries: Vec<Itinerary>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    /// Seconds
    pub duration: f64,
    pub walk_time: f64,
    pub transit_time: f64,
    #[serde(default)]
    pub waiting_time: f64,
    /// Milliseconds since epoch
    pub start_time: i64,
    pub end_time: i64,
    pub legs: Vec<Leg>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Leg {
    pub mode: String,
    pub from: Place,
    pub to: Place,
    /// Meters
    pub distance: f64,
}

impl Leg {
    pub fn is_car(&self) -> bool {
        self.mode == "CAR"
    }

    pub fn is_transit(&self) -> bool {
        matches!(self.mode.as_str(), "BUS" | "SUBWAY" | "RAIL" | "TRAM")
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Place {
    pub lon: f64,
    pub lat: f64,
    /// Milliseconds since epoch
    pub departure: Option<i64>,
    pub arrival: Option<i64>,
}

impl From<&Place> for geo::Point {
    fn from(place: &Place) -> Self {
        geo::Point::new(place.lon, place.lat)
    }
}

impl Itinerary {
    pub fn car_legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.iter().filter(|leg| leg.is_car())
    }
}

pub struct OtpClient {
    params: OtpClientParams,
    client: reqwest::Client,
}

impl OtpClient {
    pub fn new(params: OtpClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    fn query(request: &ItineraryRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            (
                "fromPlace",
                format!("{:.6},{:.6}", request.from.y(), request.from.x()),
            ),
            (
                "toPlace",
                format!("{:.6},{:.6}", request.to.y(), request.to.x()),
            ),
            ("time", request.time.strftime("%I:%M%p").to_string()),
            ("date", request.time.strftime("%m-%d-%Y").to_string()),
            ("mode", request.modes.join(",")),
            ("arriveBy", request.arrive_by.to_string()),
            ("wheelchair", String::from("false")),
            ("locale", String::from("en")),
        ];

        if let Some(max_walk_distance) = request.max_walk_distance {
            query.push(("maxWalkDistance", max_walk_distance.to_string()));
        }

        if let Some(num_itineraries) = request.num_itineraries {
            query.push(("numItineraries", num_itineraries.to_string()));
        }

        query
    }

    /// An `error` in the planner response means there is no itinerary, which is not a failure.
    pub async fn plan(&self, request: &ItineraryRequest) -> Result<Vec<Itinerary>, PlannerError> {
        let url = format!(
            "{}/otp/routers/{}/plan",
            self.params.url.trim_end_matches('/'),
            self.params.router
        );

        let response: PlanResponse = self
            .client
            .get(url)
            .query(&Self::query(request))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            debug!("No itinerary: {}", error);
            return Ok(Vec::new());
        }

        let plan = response.plan.ok_or(PlannerError::IncompleteResponse)?;

        Ok(plan.itineraries)
    }
}
