use serde_json::Value;

use crate::{validate, ApiClient, Error};

impl ApiClient {
    /// Lists the WMS/WMTS/WFS services known to the platform
    pub async fn all_geoservices(&self, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_geoservices", params)?;
        self.get("geoservices", params).await
    }

    /// Fetches a geoservice
    pub async fn get_geoservice(
        &self,
        geoservice: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_geoservice", params)?;
        self.get(&format!("geoservices/{}", geoservice), params)
            .await
    }
}
