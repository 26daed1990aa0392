//! In-memory card store used by the demo API.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::dispatcher::Reply;
use crate::router::Params;
use crate::server::Request;

/// Body sent for ids that do not exist.
pub const CARD_NOT_FOUND: &str = "Card not found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Cards keyed by id, ids handed out in increasing order.
#[derive(Debug)]
pub struct CardController {
    cards: RwLock<BTreeMap<u64, Card>>,
    next_id: AtomicU64,
}

impl Default for CardController {
    fn default() -> Self {
        Self {
            cards: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl CardController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a card built from the given fields and return it.
    pub fn insert(
        &self,
        name: &str,
        email: &str,
        title: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Card> {
        let card = Card {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            email: email.to_string(),
            title: title.map(str::to_string),
            phone: phone.map(str::to_string),
        };
        self.cards
            .write()
            .map_err(|_| anyhow!("card store lock poisoned"))?
            .insert(card.id, card.clone());
        Ok(card)
    }

    /// `GET /cards`
    pub fn list(&self, _req: &Request, _params: &Params) -> Result<Reply> {
        let cards = self
            .cards
            .read()
            .map_err(|_| anyhow!("card store lock poisoned"))?;
        let all: Vec<&Card> = cards.values().collect();
        Reply::json(&all)
    }

    /// `GET /cards/:id`. Unknown or non-numeric ids answer 404.
    pub fn show(&self, _req: &Request, params: &Params) -> Result<Reply> {
        let cards = self
            .cards
            .read()
            .map_err(|_| anyhow!("card store lock poisoned"))?;
        match parse_id(params).and_then(|id| cards.get(&id)) {
            Some(card) => Reply::json(card),
            None => Ok(Reply::error(404, CARD_NOT_FOUND)),
        }
    }

    /// `POST /cards`, answering 201. Field presence is checked by a gate
    /// before this runs.
    pub fn create(&self, req: &Request, _params: &Params) -> Result<Reply> {
        let name = req.input("name").unwrap_or_default();
        let email = req.input("email").unwrap_or_default();
        let card = self.insert(name, email, req.input("title"), req.input("phone"))?;
        info!(request_id = %req.request_id(), card_id = card.id, "Card created");
        Ok(Reply::json(&card)?.with_status(201))
    }

    /// `PUT /cards/:id`. Only fields present in the body change.
    pub fn update(&self, req: &Request, params: &Params) -> Result<Reply> {
        let mut cards = self
            .cards
            .write()
            .map_err(|_| anyhow!("card store lock poisoned"))?;
        let Some(card) = parse_id(params).and_then(|id| cards.get_mut(&id)) else {
            return Ok(Reply::error(404, CARD_NOT_FOUND));
        };
        if let Some(name) = req.input("name") {
            card.name = name.to_string();
        }
        if let Some(email) = req.input("email") {
            card.email = email.to_string();
        }
        if let Some(title) = req.input("title") {
            card.title = Some(title.to_string());
        }
        if let Some(phone) = req.input("phone") {
            card.phone = Some(phone.to_string());
        }
        Reply::json(&*card)
    }

    /// `DELETE /cards/:id`
    pub fn delete(&self, req: &Request, params: &Params) -> Result<Reply> {
        let removed = match parse_id(params) {
            Some(id) => self
                .cards
                .write()
                .map_err(|_| anyhow!("card store lock poisoned"))?
                .remove(&id)
                .is_some(),
            None => false,
        };
        if !removed {
            return Ok(Reply::error(404, CARD_NOT_FOUND));
        }
        info!(request_id = %req.request_id(), card_id = %&params[0], "Card deleted");
        Ok(json!({ "deleted": true }).into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.read().map(|c| c.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_id(params: &Params) -> Option<u64> {
    params.by_name("id")?.parse().ok()
}
