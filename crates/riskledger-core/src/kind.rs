//! Entity kinds and snapshot provenance.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::Error;

/// The kind of tracked item a master record represents.
///
/// Parses from either the singular or the plural form (`risk`, `risks`), so
/// the same type can be taken straight from a URL segment.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum EntityKind {
  #[strum(to_string = "risk", serialize = "risks")]
  Risk,
  #[strum(to_string = "issue", serialize = "issues")]
  Issue,
}

impl EntityKind {
  /// The letter embedded in allocated identifiers (`PROJ-R001`, `PROJ-I001`).
  pub fn letter(self) -> char {
    match self {
      Self::Risk => 'R',
      Self::Issue => 'I',
    }
  }

  /// Parse a kind from user input, mapping failures to [`Error::UnknownKind`].
  pub fn parse(s: &str) -> crate::Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownKind(s.to_owned()))
  }
}

/// How a snapshot came to exist.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CapturedBy {
  /// Written once by the migration job at cutover.
  Migration,
  /// Written by the bi-weekly capture job.
  #[default]
  Auto,
  /// Written on demand (registration, record-changed events, manual capture).
  Manual,
}

impl CapturedBy {
  /// Periodic snapshots are subject to the one-per-period constraint;
  /// manual ones are not.
  pub fn is_periodic(self) -> bool { !matches!(self, Self::Manual) }

  pub fn parse(s: &str) -> crate::Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownProvenance(s.to_owned()))
  }
}
