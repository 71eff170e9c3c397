//! In-memory collaborators for tests and demos
//!
//! Each type implements the same trait as its HTTP counterpart, so a
//! [`CivicClient`](crate::CivicClient) built on them runs every workflow
//! without a network.

mod identity;
mod media;
mod store;

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::geocode::{AddressComponents, Geocoder};
use crate::report::Coordinates;

pub use identity::MemoryIdentity;
pub use media::MemoryMediaHost;
pub use store::{MemoryStore, Procedure, Tables};

/// Points closer than this (in degrees) resolve to the same address
const MATCH_TOLERANCE: f64 = 1e-6;

/// Geocoder answering from a fixed table of points
#[derive(Default)]
pub struct StaticGeocoder {
    addresses: RwLock<Vec<(Coordinates, AddressComponents)>>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(self, at: Coordinates, address: AddressComponents) -> Self {
        self.insert(at, address);
        self
    }

    pub fn insert(&self, at: Coordinates, address: AddressComponents) {
        self.addresses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((at, address));
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<AddressComponents> {
        self.addresses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(at, _)| {
                (at.latitude - latitude).abs() < MATCH_TOLERANCE
                    && (at.longitude - longitude).abs() < MATCH_TOLERANCE
            })
            .map(|(_, address)| address.clone())
            .ok_or_else(|| Error::geocode(format!("no address near {}, {}", latitude, longitude)))
    }
}
