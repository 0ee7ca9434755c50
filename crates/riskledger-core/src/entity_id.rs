//! Human-readable master identifiers: `"{ProjectCode}-{R|I}{NNN}"`.
//!
//! The numeric suffix is zero-padded to [`SEQUENCE_WIDTH`] digits. Once a
//! sequence passes 999 the suffix simply grows a digit; ordering is always
//! decided on the parsed number, never on the string.

use crate::kind::EntityKind;

pub const SEQUENCE_WIDTH: usize = 3;

/// Build the identifier for sequence number `seq` of `kind` in a project.
pub fn format_entity_id(project_code: &str, kind: EntityKind, seq: u32) -> String {
  format!(
    "{project_code}-{}{seq:0width$}",
    kind.letter(),
    width = SEQUENCE_WIDTH
  )
}

/// Parse the trailing sequence number of `entity_id` for `kind`.
///
/// Returns `None` when the id does not end in `-{letter}{digits}`.
pub fn parse_sequence(entity_id: &str, kind: EntityKind) -> Option<u32> {
  let (_, tail) = entity_id.rsplit_once('-')?;
  let digits = tail.strip_prefix(kind.letter())?;
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  digits.parse().ok()
}

/// The identifier that follows `greatest`, the highest id already allocated
/// for this project and kind.
///
/// Falls back to sequence 1 when there is no prior id or when the prior id
/// does not match the expected suffix pattern.
pub fn next_entity_id(
  project_code: &str,
  kind: EntityKind,
  greatest: Option<&str>,
) -> String {
  let next = greatest
    .and_then(|id| parse_sequence(id, kind))
    .map_or(1, |n| n.saturating_add(1));
  format_entity_id(project_code, kind, next)
}

/// The prefix shared by every id allocated for a project.
pub fn project_prefix(project_code: &str) -> String { format!("{project_code}-") }

/// Infer the entity kind from an identifier's suffix letter.
pub fn kind_of(entity_id: &str) -> Option<EntityKind> {
  let (_, tail) = entity_id.rsplit_once('-')?;
  match tail.chars().next()? {
    'R' if parse_sequence(entity_id, EntityKind::Risk).is_some() => {
      Some(EntityKind::Risk)
    }
    'I' if parse_sequence(entity_id, EntityKind::Issue).is_some() => {
      Some(EntityKind::Issue)
    }
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_with_three_digit_padding() {
    assert_eq!(format_entity_id("PROJ001", EntityKind::Risk, 1), "PROJ001-R001");
    assert_eq!(format_entity_id("PROJ001", EntityKind::Issue, 42), "PROJ001-I042");
    assert_eq!(format_entity_id("P", EntityKind::Risk, 1000), "P-R1000");
  }

  #[test]
  fn first_id_when_project_is_empty() {
    assert_eq!(next_entity_id("ALPHA", EntityKind::Risk, None), "ALPHA-R001");
  }

  #[test]
  fn increments_greatest_existing() {
    assert_eq!(
      next_entity_id("ALPHA", EntityKind::Risk, Some("ALPHA-R009")),
      "ALPHA-R010"
    );
    assert_eq!(
      next_entity_id("ALPHA", EntityKind::Issue, Some("ALPHA-I999")),
      "ALPHA-I1000"
    );
  }

  #[test]
  fn malformed_greatest_falls_back_to_first() {
    assert_eq!(
      next_entity_id("ALPHA", EntityKind::Risk, Some("ALPHA-legacy")),
      "ALPHA-R001"
    );
    // An issue id is not a valid predecessor for a risk id.
    assert_eq!(
      next_entity_id("ALPHA", EntityKind::Risk, Some("ALPHA-I004")),
      "ALPHA-R001"
    );
  }

  #[test]
  fn parse_handles_hyphenated_project_codes() {
    assert_eq!(parse_sequence("EPC-NORTH-R017", EntityKind::Risk), Some(17));
    assert_eq!(parse_sequence("EPC-NORTH-R", EntityKind::Risk), None);
    assert_eq!(parse_sequence("EPC-NORTH-R01x", EntityKind::Risk), None);
    assert_eq!(parse_sequence("NOHYPHEN", EntityKind::Risk), None);
  }

  #[test]
  fn kind_is_inferred_from_suffix() {
    assert_eq!(kind_of("P-R001"), Some(EntityKind::Risk));
    assert_eq!(kind_of("P-I001"), Some(EntityKind::Issue));
    assert_eq!(kind_of("P-X001"), None);
    assert_eq!(kind_of("P-Rabc"), None);
  }
}
