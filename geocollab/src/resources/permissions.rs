use reqwest::Method;
use serde_json::Value;

use crate::{
    validate::{self, Intent, Resource},
    ApiClient, Error,
};

impl ApiClient {
    /// Lists the permissions granted to communities on databases
    pub async fn all_permissions(&self, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_permissions", params)?;
        self.get("permissions", params).await
    }

    /// Fetches a permission
    pub async fn get_permission(
        &self,
        permission: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_permission", params)?;
        self.get(&format!("permissions/{}", permission), params)
            .await
    }

    /// Grants a permission; `database`, `community` and `level` are required
    pub async fn create_permission(&self, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Permission, Intent::Create, body)?;
        self.send_json(Method::POST, "permissions", body).await
    }

    /// Changes a permission
    pub async fn update_permission(&self, permission: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Permission, Intent::Update, body)?;
        self.send_json(Method::PATCH, &format!("permissions/{}", permission), body)
            .await
    }

    /// Revokes a permission
    pub async fn delete_permission(&self, permission: u64) -> Result<Value, Error> {
        self.delete(&format!("permissions/{}", permission)).await
    }
}
