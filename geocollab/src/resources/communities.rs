use reqwest::Method;
use serde_json::Value;

use crate::{
    validate::{self, Intent, Resource},
    ApiClient, Error,
};

impl ApiClient {
    /// Lists communities
    pub async fn all_communities(&self, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_communities", params)?;
        self.get("communities", params).await
    }

    /// Fetches a community
    pub async fn get_community(
        &self,
        community: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_community", params)?;
        self.get(&format!("communities/{}", community), params)
            .await
    }

    /// Creates a community; `name` is required
    pub async fn create_community(&self, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Community, Intent::Create, body)?;
        self.send_json(Method::POST, "communities", body).await
    }

    /// Updates a community
    pub async fn update_community(&self, community: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Community, Intent::Update, body)?;
        self.send_json(Method::PATCH, &format!("communities/{}", community), body)
            .await
    }

    /// Deletes a community
    pub async fn delete_community(&self, community: u64) -> Result<Value, Error> {
        self.delete(&format!("communities/{}", community)).await
    }

    /// Lists the members of a community
    pub async fn all_members(
        &self,
        community: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("all_members", params)?;
        self.get(&format!("communities/{}/members", community), params)
            .await
    }

    /// Fetches a community member
    pub async fn get_member(
        &self,
        community: u64,
        user: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_member", params)?;
        self.get(&format!("communities/{}/members/{}", community, user), params)
            .await
    }

    /// Adds a user to a community; `user_id` is required
    pub async fn add_member(&self, community: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Member, Intent::Create, body)?;
        self.send_json(
            Method::POST,
            &format!("communities/{}/members", community),
            body,
        )
        .await
    }

    /// Changes a member's role, profile or activity
    pub async fn update_member(
        &self,
        community: u64,
        user: u64,
        body: &Value,
    ) -> Result<Value, Error> {
        let body = validate::body(Resource::Member, Intent::Update, body)?;
        self.send_json(
            Method::PATCH,
            &format!("communities/{}/members/{}", community, user),
            body,
        )
        .await
    }

    /// Removes a user from a community
    pub async fn remove_member(&self, community: u64, user: u64) -> Result<Value, Error> {
        self.delete(&format!("communities/{}/members/{}", community, user))
            .await
    }

    /// Lists the map layers of a community
    pub async fn all_layers(
        &self,
        community: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("all_layers", params)?;
        self.get(&format!("communities/{}/layers", community), params)
            .await
    }

    /// Fetches a map layer
    pub async fn get_layer(
        &self,
        community: u64,
        layer: u64,
        params: &[(&str, &str)],
    ) -> Result<Value, Error> {
        validate::params("get_layer", params)?;
        self.get(&format!("communities/{}/layers/{}", community, layer), params)
            .await
    }

    /// Adds a map layer; `order` is required
    pub async fn add_layer(&self, community: u64, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::Layer, Intent::Create, body)?;
        self.send_json(
            Method::POST,
            &format!("communities/{}/layers", community),
            body,
        )
        .await
    }

    /// Updates a map layer
    pub async fn update_layer(
        &self,
        community: u64,
        layer: u64,
        body: &Value,
    ) -> Result<Value, Error> {
        let body = validate::body(Resource::Layer, Intent::Update, body)?;
        self.send_json(
            Method::PATCH,
            &format!("communities/{}/layers/{}", community, layer),
            body,
        )
        .await
    }

    /// Removes a map layer
    pub async fn remove_layer(&self, community: u64, layer: u64) -> Result<Value, Error> {
        self.delete(&format!("communities/{}/layers/{}", community, layer))
            .await
    }
}
