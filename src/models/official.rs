use serde::{Deserialize, Serialize};

/// Municipal contact listed in the app's directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MunicipalOfficial {
    pub id: String,
    pub name: String,
    pub department: String,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub ward: Option<String>,
}
