use reqwest::Method;
use serde_json::Value;

use crate::{
    validate::{self, Intent, Resource},
    ApiClient, Error,
};

impl ApiClient {
    /// Lists databases
    pub async fn all_databases(&self, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_databases", params)?;
        self.get("databases", params).await
    }

    /// Fetches a database
    pub async fn get_database(
        &self,
        database: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_database", params)?;
        self.get(&format!("databases/{}", database), params).await
    }

    /// Registers a database
    pub async fn create_database(&self, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Database, Intent::Create, body)?;
        self.send_json(Method::POST, "databases", body).await
    }

    /// Updates a database
    pub async fn update_database(&self, database: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Database, Intent::Update, body)?;
        self.send_json(Method::PATCH, &format!("databases/{}", database), body)
            .await
    }

    /// Deletes a database
    pub async fn delete_database(&self, database: u64) -> Result<Value, Error> {
        self.delete(&format!("databases/{}", database)).await
    }

    /// Lists the tables of a database
    pub async fn all_tables(&self, database: u64, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_tables", params)?;
        self.get(&format!("databases/{}/tables", database), params)
            .await
    }

    /// Fetches a table
    pub async fn get_table(
        &self,
        database: u64,
        table: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_table", params)?;
        self.get(&format!("databases/{}/tables/{}", database, table), params)
            .await
    }

    /// Creates a table
    ///
    /// `name`, `title`, `id_name`, `geometry_name` and `table_name` are required.
    pub async fn create_table(&self, database: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Table, Intent::Create, body)?;
        self.send_json(
            Method::POST,
            &format!("databases/{}/tables", database),
            body,
        )
        .await
    }

    /// Updates a table
    pub async fn update_table(
        &self,
        database: u64,
        table: u64,
        body: &Value,
    ) -> Result<Value, Error> {
        let body = validate::body(Resource::Table, Intent::Update, body)?;
        self.send_json(
            Method::PATCH,
            &format!("databases/{}/tables/{}", database, table),
            body,
        )
        .await
    }

    /// Deletes a table
    pub async fn delete_table(&self, database: u64, table: u64) -> Result<Value, Error> {
        self.delete(&format!("databases/{}/tables/{}", database, table))
            .await
    }

    /// Lists the columns of a table
    pub async fn all_columns(
        &self,
        database: u64,
        table: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("all_columns", params)?;
        self.get(&columns_path(database, table), params).await
    }

    /// Fetches a column
    pub async fn get_column(
        &self,
        database: u64,
        table: u64,
        column: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_column", params)?;
        self.get(
            &format!("{}/{}", columns_path(database, table), column),
            params,
        )
        .await
    }

    /// Adds a column to a table
    pub async fn create_column(
        &self,
        database: u64,
        table: u64,
        body: &Value,
    ) -> Result<Value, Error> {
        let body = validate::object(body)?;
        self.send_json(Method::POST, &columns_path(database, table), body)
            .await
    }

    /// Updates a column
    pub async fn update_column(
        &self,
        database: u64,
        table: u64,
        column: u64,
        body: &Value,
    ) -> Result<Value, Error> {
        let body = validate::object(body)?;
        self.send_json(
            Method::PATCH,
            &format!("{}/{}", columns_path(database, table), column),
            body,
        )
        .await
    }

    /// Removes a column from a table
    pub async fn delete_column(
        &self,
        database: u64,
        table: u64,
        column: u64,
    ) -> Result<Value, Error> {
        self.delete(&format!("{}/{}", columns_path(database, table), column))
            .await
    }

    /// Lists the features of a table
    pub async fn all_features(
        &self,
        database: u64,
        table: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("all_features", params)?;
        self.get(&features_path(database, table), params).await
    }

    /// Fetches a feature
    pub async fn get_feature(
        &self,
        database: u64,
        table: u64,
        feature: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_feature", params)?;
        self.get(
            &format!("{}/{}", features_path(database, table), feature),
            params,
        )
        .await
    }

    /// Creates a feature; the body holds its attributes and geometry
    pub async fn create_feature(
        &self,
        database: u64,
        table: u64,
        body: &Value,
    ) -> Result<Value, Error> {
        let body = validate::object(body)?;
        self.send_json(Method::POST, &features_path(database, table), body)
            .await
    }

    /// Updates a feature
    pub async fn update_feature(
        &self,
        database: u64,
        table: u64,
        feature: u64,
        body: &Value,
    ) -> Result<Value, Error> {
        let body = validate::object(body)?;
        self.send_json(
            Method::PATCH,
            &format!("{}/{}", features_path(database, table), feature),
            body,
        )
        .await
    }

    /// Deletes a feature
    pub async fn delete_feature(
        &self,
        database: u64,
        table: u64,
        feature: u64,
    ) -> Result<Value, Error> {
        self.delete(&format!("{}/{}", features_path(database, table), feature))
            .await
    }

    /// Lists the versions of a versioned database
    pub async fn all_versions(
        &self,
        database: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("all_versions", params)?;
        self.get(&format!("databases/{}/versions", database), params)
            .await
    }

    /// Lists the file uploads into a database
    pub async fn all_uploads(
        &self,
        database: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("all_uploads", params)?;
        self.get(&format!("databases/{}/uploads", database), params)
            .await
    }

    /// Lists the transactions applied to a database
    pub async fn all_transactions(
        &self,
        database: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("all_transactions", params)?;
        self.get(&format!("databases/{}/transactions", database), params)
            .await
    }

    /// Applies a batch of feature edits; `comment` and `actions` are required
    pub async fn create_transaction(&self, database: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Transaction, Intent::Create, body)?;
        self.send_json(
            Method::POST,
            &format!("databases/{}/transactions", database),
            body,
        )
        .await
    }
}

fn columns_path(database: u64, table: u64) -> String {
    format!("databases/{}/tables/{}/columns", database, table)
}

fn features_path(database: u64, table: u64) -> String {
    format!("databases/{}/tables/{}/features", database, table)
}
