//! Web front end for relboard.
//!
//! Aggregates releases and their contributors through [`service::ReleaseService`],
//! shapes them into [`views`], renders HTML with [`render::TemplateRenderer`],
//! and serves everything over axum via [`server`].

pub mod render;
pub mod server;
pub mod service;
pub mod views;
