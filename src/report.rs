//! Issue report form: draft validation and location capture

use async_trait::async_trait;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::geocode::{AddressComponents, Geocoder};
use crate::models::{IssueCategory, IssuePriority, NewIssue};

/// A point on the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Checked constructor; rejects out-of-range or non-finite values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::validation(format!("latitude out of range: {}", latitude)));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::validation(format!("longitude out of range: {}", longitude)));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Raw coordinates as shown when no address is available
    pub fn display(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Location fields of a report; all optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationFields {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub ward: Option<String>,
}

impl LocationFields {
    pub fn is_empty(&self) -> bool {
        self == &LocationFields::default()
    }

    /// Fill the fields from a geocoded point
    fn from_address(at: Coordinates, address: &AddressComponents) -> Self {
        let display = address.display_address().unwrap_or_else(|| at.display());
        Self {
            latitude: Some(at.latitude),
            longitude: Some(at.longitude),
            location_name: address
                .street
                .clone()
                .or_else(|| address.area.clone())
                .or_else(|| Some(display.clone())),
            address: Some(display),
            area: address.area.clone().or_else(|| address.city.clone()),
            ward: address.ward.clone(),
        }
    }

    /// Fill the fields with the raw point only
    fn from_coordinates(at: Coordinates) -> Self {
        Self {
            latitude: Some(at.latitude),
            longitude: Some(at.longitude),
            location_name: Some(at.display()),
            address: Some(at.display()),
            area: None,
            ward: None,
        }
    }
}

/// Report form contents before submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub category: Option<IssueCategory>,
    pub priority: IssuePriority,
    pub location: LocationFields,
}

impl IssueDraft {
    pub fn new(title: &str, description: &str, category: IssueCategory) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: IssuePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_location(mut self, location: LocationFields) -> Self {
        self.location = location;
        self
    }

    /// Names of required fields that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.category.is_none() {
            missing.push("category");
        }
        missing
    }

    /// Check the required fields. Location is optional.
    pub fn validate(&self) -> Result<IssueCategory> {
        let missing = self.missing_fields();
        match self.category {
            Some(category) if missing.is_empty() => Ok(category),
            _ => Err(Error::validation(format!(
                "Please fill in all required fields: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Build the insert payload with the uploaded image URLs
    pub fn into_new_issue(self, images: Vec<String>) -> Result<NewIssue> {
        let category = self.validate()?;
        let location = self.location;
        Ok(NewIssue {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category,
            priority: self.priority,
            location_name: location.location_name,
            address: location.address,
            area: location.area,
            ward: location.ward,
            latitude: location.latitude,
            longitude: location.longitude,
            images,
        })
    }
}

/// Answer to a location permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Device positioning, provided by the host platform
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self) -> Result<Coordinates>;
}

/// Map-pick mode: each tap moves a pending marker until it is confirmed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapPick {
    pending: Option<Coordinates>,
}

impl MapPick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the marker on an existing point
    pub fn starting_at(at: Coordinates) -> Self {
        Self { pending: Some(at) }
    }

    pub fn tap(&mut self, at: Coordinates) {
        self.pending = Some(at);
    }

    pub fn pending(&self) -> Option<Coordinates> {
        self.pending
    }
}

/// How a location fix was resolved
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    /// `None` when reverse geocoding failed and raw coordinates were used
    pub address: Option<AddressComponents>,
}

/// Fills a draft's location from the device or from the map
pub struct LocationCapture<'a> {
    geocoder: &'a dyn Geocoder,
}

impl<'a> LocationCapture<'a> {
    pub fn new(geocoder: &'a dyn Geocoder) -> Self {
        Self { geocoder }
    }

    /// Current-location mode.
    ///
    /// A denied permission returns `Error::PermissionDenied` and leaves the
    /// draft untouched; there is no retry.
    pub async fn current_location(
        &self,
        draft: &mut IssueDraft,
        source: &dyn LocationSource,
    ) -> Result<LocationFix> {
        if source.request_permission().await == PermissionStatus::Denied {
            return Err(Error::permission_denied(
                "Permission to access location was denied",
            ));
        }
        let at = source.current_position().await?;
        Ok(self.apply(draft, at).await)
    }

    /// Map-pick mode; confirming without a marker is a validation error
    pub async fn map_pick(&self, draft: &mut IssueDraft, pick: MapPick) -> Result<LocationFix> {
        let at = pick
            .pending()
            .ok_or_else(|| Error::validation("Tap the map to choose a location first"))?;
        Ok(self.apply(draft, at).await)
    }

    /// Reverse geocode `at` into the draft, falling back to raw coordinates
    async fn apply(&self, draft: &mut IssueDraft, at: Coordinates) -> LocationFix {
        debug!("Resolving location {}", at.display());
        match self.geocoder.reverse(at.latitude, at.longitude).await {
            Ok(address) => {
                draft.location = LocationFields::from_address(at, &address);
                LocationFix {
                    coordinates: at,
                    address: Some(address),
                }
            }
            Err(err) => {
                warn!("Reverse geocoding failed, keeping raw coordinates: {}", err);
                draft.location = LocationFields::from_coordinates(at);
                LocationFix {
                    coordinates: at,
                    address: None,
                }
            }
        }
    }
}
