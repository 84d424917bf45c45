//! This module provides a client to read and write iCal files on a CalDAV server
//!
//! This is a bare GET/PUT client: finding calendars, and retrying failed requests, is left to other layers.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use url::Url;

use crate::error::{RemoteError, StoreError};
use crate::item::ItemId;
use crate::traits::TaskStore;


/// A [`TaskStore`] backed by a CalDAV server
#[derive(Clone)]
pub struct Client {
    url: Url,
    username: String,
    password: String,

    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection.
    ///
    /// `url` is the base URL relative item identifiers are resolved against (usually a calendar collection).
    pub fn new<S: AsRef<str>, T: ToString, U: ToString>(url: S, username: T, password: U) -> Result<Self, url::ParseError> {
        let url = Url::parse(url.as_ref())?;

        Ok(Self{
            url,
            username: username.to_string(),
            password: password.to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn url(&self) -> &Url { &self.url }

    /// The URL of an item: either the identifier itself when it is an absolute URL, or the identifier resolved against the base URL
    pub fn item_url(&self, id: &ItemId) -> Result<Url, RemoteError> {
        match Url::parse(id.as_str()) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(self.url.join(id.as_str())?),
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &ItemId) -> Result<String, RemoteError> {
        let url = self.item_url(id)?;
        let response = self.http
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        if response.status().is_success() == false {
            return Err(RemoteError::from_status(response.status().as_u16(), url.as_str()));
        }

        Ok(response.text().await?)
    }

    async fn put(&self, id: &ItemId, content: String) -> Result<(), RemoteError> {
        let url = self.item_url(id)?;
        let response = self.http
            .put(url.clone())
            .header(CONTENT_TYPE, "text/calendar; charset=utf-8")
            .header(CONTENT_LENGTH, content.len())
            .basic_auth(&self.username, Some(&self.password))
            .body(content)
            .send()
            .await?;

        if response.status().is_success() == false {
            return Err(RemoteError::from_status(response.status().as_u16(), url.as_str()));
        }

        log::debug!("PUT {} ({})", url, response.status());
        Ok(())
    }
}

#[async_trait]
impl TaskStore for Client {
    async fn fetch(&self, id: &ItemId) -> Result<String, StoreError> {
        Ok(self.get(id).await?)
    }

    async fn write(&mut self, id: &ItemId, content: String) -> Result<(), StoreError> {
        Ok(self.put(id, content).await?)
    }
}
