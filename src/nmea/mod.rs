//! # NMEA Module
//!
//! Parsing of NMEA 0183 sentences from the local GPS receiver.
//!
//! This module handles:
//! - Degree/minute coordinate text to signed decimal degrees
//! - GGA (fix data) and RMC (recommended minimum) sentence parsing
//! - Fix-quality validation before a record enters the pipeline

pub mod coordinates;
pub mod parser;
