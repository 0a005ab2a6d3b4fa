use reqwest::Method;
use serde_json::Value;

use crate::{
    multipart::{self, Attachment},
    validate::{self, Intent, Resource},
    ApiClient, Error,
};

impl ApiClient {
    /// Lists field reports
    pub async fn all_reports(&self, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_reports", params)?;
        self.get("reports", params).await
    }

    /// Fetches a report
    pub async fn get_report(&self, report: u64, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("get_report", params)?;
        self.get(&format!("reports/{}", report), params).await
    }

    /// Files a report with optional attachments; `geometry` is required
    ///
    /// The body is sent as `multipart/form-data`, with nested members named
    /// `parent[key]` and each attachment as a file part.
    pub async fn create_report(
        &self,
        body: &Value,
        attachments: Vec<Attachment>,
    ) -> Result<Value, Error> {
        let body = validate::body(Resource::Report, Intent::Create, body)?;
        let form = multipart::form(body, attachments)?;
        self.send_form("reports", form).await
    }

    /// Updates a report
    pub async fn update_report(&self, report: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Report, Intent::Update, body)?;
        self.send_json(Method::PATCH, &format!("reports/{}", report), body)
            .await
    }

    /// Lists the replies to a report
    pub async fn all_replies(&self, report: u64, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_replies", params)?;
        self.get(&format!("reports/{}/replies", report), params)
            .await
    }

    /// Replies to a report with optional attachments
    pub async fn add_reply(
        &self,
        report: u64,
        body: &Value,
        attachments: Vec<Attachment>,
    ) -> Result<Value, Error> {
        let body = validate::object(body)?;
        let form = multipart::form(body, attachments)?;
        self.send_form(&format!("reports/{}/replies", report), form)
            .await
    }
}
