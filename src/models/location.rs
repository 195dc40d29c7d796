use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// 打卡地点，`radius_meters` 限定抖动范围
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    #[serde(default)]
    pub address: String,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64, radius_meters: f64) -> AppResult<Self> {
        let location = Self {
            latitude,
            longitude,
            radius_meters,
            address: String::new(),
        };
        location.validate()?;
        Ok(location)
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::Validation(format!("纬度超出范围: {}", self.latitude)));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::Validation(format!("经度超出范围: {}", self.longitude)));
        }
        // NaN 也会落到这里
        if !(self.radius_meters > 0.0) {
            return Err(AppError::Validation(format!(
                "抖动半径必须大于 0: {}",
                self.radius_meters
            )));
        }
        Ok(())
    }
}
