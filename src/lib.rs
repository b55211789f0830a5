//! # Registration Checker Client
//!
//! Client-side state for checking whether a food, drug or cosmetic product is
//! registered with the national regulator.
//!
//! ## Notes
//!
//! - Lookups and paging go through [`registry`]; nothing here talks to the network
//! - [`feed`] and [`virtual_list`] together drive the infinite catalog listing
//! - [`view`] renders a verification result, one [`boundary`] per card
//! - [`tracker`] persists the device's search count and theme

pub mod boundary;
pub mod cache;
pub mod feed;
pub mod tracker;
pub mod view;
pub mod virtual_list;
