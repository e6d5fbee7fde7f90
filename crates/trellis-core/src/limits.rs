//! Input validation limits for the write path

/// Maximum length for entity names (256 chars)
pub const MAX_ENTITY_NAME_LEN: usize = 256;

/// Maximum length for a single observation (64KB)
pub const MAX_OBSERVATION_LEN: usize = 64 * 1024;

/// Maximum observations per entity (1000)
pub const MAX_OBSERVATIONS_PER_ENTITY: usize = 1000;

/// Maximum entities in a batch create (100)
pub const MAX_BATCH_ENTITIES: usize = 100;

/// Maximum relations in a batch create (100)
pub const MAX_BATCH_RELATIONS: usize = 100;

/// A write rejected before it reaches storage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Entity name too long: {len} chars (max {max})")]
    EntityNameTooLong { len: usize, max: usize },
    #[error("Observation too long: {len} chars (max {max})")]
    ObservationTooLong { len: usize, max: usize },
    #[error("Too many observations: {count} (max {max})")]
    TooManyObservations { count: usize, max: usize },
    #[error("Too many entities in batch: {count} (max {max})")]
    TooManyEntities { count: usize, max: usize },
    #[error("Too many relations in batch: {count} (max {max})")]
    TooManyRelations { count: usize, max: usize },
    #[error("Entity name cannot be empty")]
    EmptyEntityName,
    #[error("Observation cannot be empty")]
    EmptyObservation,
    #[error("Relation type cannot be empty")]
    EmptyRelationType,
}

/// `Err(over(value, max))` when `value` exceeds `max`
fn at_most(
    value: usize,
    max: usize,
    over: fn(usize, usize) -> ValidationError,
) -> Result<(), ValidationError> {
    if value > max {
        Err(over(value, max))
    } else {
        Ok(())
    }
}

pub fn validate_entity_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyEntityName);
    }
    at_most(name.len(), MAX_ENTITY_NAME_LEN, |len, max| {
        ValidationError::EntityNameTooLong { len, max }
    })
}

/// Observations are stored verbatim, so only emptiness and size are checked
pub fn validate_observation(obs: &str) -> Result<(), ValidationError> {
    if obs.is_empty() {
        return Err(ValidationError::EmptyObservation);
    }
    at_most(obs.len(), MAX_OBSERVATION_LEN, |len, max| {
        ValidationError::ObservationTooLong { len, max }
    })
}

pub fn validate_observation_count(count: usize) -> Result<(), ValidationError> {
    at_most(count, MAX_OBSERVATIONS_PER_ENTITY, |count, max| {
        ValidationError::TooManyObservations { count, max }
    })
}

/// Endpoints follow entity name rules; the type must be non-blank
pub fn validate_relation(from: &str, to: &str, relation_type: &str) -> Result<(), ValidationError> {
    validate_entity_name(from)?;
    validate_entity_name(to)?;
    if relation_type.trim().is_empty() {
        return Err(ValidationError::EmptyRelationType);
    }
    Ok(())
}

pub fn validate_batch_entities(count: usize) -> Result<(), ValidationError> {
    at_most(count, MAX_BATCH_ENTITIES, |count, max| {
        ValidationError::TooManyEntities { count, max }
    })
}

pub fn validate_batch_relations(count: usize) -> Result<(), ValidationError> {
    at_most(count, MAX_BATCH_RELATIONS, |count, max| {
        ValidationError::TooManyRelations { count, max }
    })
}
