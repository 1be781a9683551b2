use crate::core::{Manuscript, ManuscriptPatch, Result, TrackerError};

/// Finds another entity whose correlation key matches `manuscript_id`,
/// ignoring case and surrounding whitespace. `exclude_id` is the entity being
/// edited, if any.
pub fn find_duplicate<'a, I>(
    manuscript_id: &str,
    exclude_id: Option<&str>,
    entities: I,
) -> Option<&'a Manuscript>
where
    I: IntoIterator<Item = &'a Manuscript>,
{
    let needle = manuscript_id.trim().to_lowercase();
    entities.into_iter().find(|entity| {
        exclude_id != Some(entity.id.as_str())
            && entity.manuscript_id.trim().to_lowercase() == needle
    })
}

/// [`find_duplicate`] turned into a rejection.
pub fn ensure_unique<'a, I>(manuscript_id: &str, exclude_id: Option<&str>, entities: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Manuscript>,
{
    match find_duplicate(manuscript_id, exclude_id, entities) {
        Some(existing) => Err(TrackerError::Duplicate {
            manuscript_id: manuscript_id.trim().to_string(),
            existing_id: existing.id.clone(),
        }),
        None => Ok(()),
    }
}

pub fn validate_required(manuscript_id: &str, journal_code: &str) -> Result<()> {
    if manuscript_id.trim().is_empty() {
        return Err(TrackerError::validation("manuscript ID is required"));
    }
    if journal_code.trim().is_empty() {
        return Err(TrackerError::validation("journal code is required"));
    }
    Ok(())
}

/// A patch may leave the required fields alone but must not blank them.
pub fn validate_patch(patch: &ManuscriptPatch) -> Result<()> {
    if patch
        .manuscript_id
        .as_deref()
        .is_some_and(|value| value.trim().is_empty())
    {
        return Err(TrackerError::validation("manuscript ID cannot be blank"));
    }
    if patch
        .journal_code
        .as_deref()
        .is_some_and(|value| value.trim().is_empty())
    {
        return Err(TrackerError::validation("journal code cannot be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManuscriptDraft;
    use chrono::Utc;

    fn entity(id: &str, manuscript_id: &str) -> Manuscript {
        ManuscriptDraft::new(manuscript_id, "JRN")
            .id(id)
            .into_manuscript(Utc::now())
    }

    #[test]
    fn test_match_ignores_case() {
        let entities = vec![entity("a", "J-1"), entity("b", "J-2")];
        let found = find_duplicate("j-1", None, &entities).unwrap();
        assert_eq!(found.id, "a");
        assert!(find_duplicate("J-3", None, &entities).is_none());
    }

    #[test]
    fn test_self_is_excluded() {
        let entities = vec![entity("a", "J-1"), entity("b", "J-2")];
        assert!(find_duplicate("J-1", Some("a"), &entities).is_none());
        assert_eq!(find_duplicate("J-2", Some("a"), &entities).unwrap().id, "b");
    }

    #[test]
    fn test_ensure_unique_reports_conflicting_entry() {
        let entities = vec![entity("a", "J-1")];
        let err = ensure_unique(" j-1 ", None, &entities).unwrap_err();
        match err {
            TrackerError::Duplicate {
                manuscript_id,
                existing_id,
            } => {
                assert_eq!(manuscript_id, "j-1");
                assert_eq!(existing_id, "a");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_required_fields() {
        assert!(validate_required("J-1", "JRN").is_ok());
        assert!(validate_required("  ", "JRN").is_err());
        assert!(validate_required("J-1", "").is_err());
    }

    #[test]
    fn test_patch_cannot_blank_key() {
        assert!(validate_patch(&ManuscriptPatch::new().manuscript_id(" ")).is_err());
        assert!(validate_patch(&ManuscriptPatch::new().journal_code("")).is_err());
        assert!(validate_patch(&ManuscriptPatch::new()).is_ok());
    }
}
