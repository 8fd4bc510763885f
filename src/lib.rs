// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conduit Server - Social Blogging Backend
//!
//! Five data-owning services talk to each other only through an in-process
//! service broker. Reads are composed by batched relation population, and
//! viewer-relative fields are derived from the favorite and follow ledgers
//! on every request.
//!
//! ## Modules
//!
//! - `api` - HTTP gateway (Axum)
//! - `auth` - Token issuing, password hashing and the gateway filter
//! - `broker` - Service registry, access levels and nested calls
//! - `populate` - Batched relation resolution
//! - `services` - users, articles, comments, favorites, follows
//! - `storage` - redb-backed collections with unique indexes

pub mod api;
pub mod auth;
pub mod broker;
pub mod config;
pub mod error;
pub mod models;
pub mod populate;
pub mod services;
pub mod state;
pub mod storage;
pub mod telemetry;
