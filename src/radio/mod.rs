//! # Radio Module
//!
//! Decoding of LoRa payload frames relayed from remote nodes.
//!
//! This module handles:
//! - Delimited-field payloads (`id,lat,lng[,speed],signal`)
//! - JSON payloads, including objects embedded in radio noise
//! - Last-resort numeric scanning of free text

pub mod decoder;
