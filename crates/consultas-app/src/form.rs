// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{FormValues, QueryDefinition, QueryId, RequestGeneration, catalog};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("unknown query {0} -- pick an entry from the catalog")]
    UnknownQuery(QueryId),
    #[error("no query selected -- pick an entry from the catalog first")]
    NoQuerySelected,
    #[error("field {field:?} does not belong to query {query}")]
    UnknownField { query: QueryId, field: String },
    #[error("\"{label}\" is required -- fill it in and retry")]
    MissingField { label: &'static str },
    #[error("a query is already running -- wait for it to finish")]
    SubmissionPending,
}

/// Validated parameters ready to be sent, stamped with the generation the
/// response must carry to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub generation: RequestGeneration,
    pub query_id: QueryId,
    pub params: FormValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormController {
    selected: Option<&'static QueryDefinition>,
    values: FormValues,
    error: Option<String>,
    generation: RequestGeneration,
    pending: Option<RequestGeneration>,
}

impl Default for FormController {
    fn default() -> Self {
        Self {
            selected: None,
            values: FormValues::new(),
            error: None,
            generation: RequestGeneration::new(0),
            pending: None,
        }
    }
}

impl FormController {
    pub fn selected(&self) -> Option<&'static QueryDefinition> {
        self.selected
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).unwrap_or_default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_generation(&self) -> Option<RequestGeneration> {
        self.pending
    }

    /// Switches to `id`, dropping values, error, and any pending dispatch.
    pub fn select(&mut self, id: QueryId) -> Result<&'static QueryDefinition, FormError> {
        let definition = catalog::lookup(id).ok_or(FormError::UnknownQuery(id))?;
        self.selected = Some(definition);
        self.values.clear();
        self.error = None;
        self.pending = None;
        Ok(definition)
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.values.clear();
        self.error = None;
        self.pending = None;
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        let definition = self.selected.ok_or(FormError::NoQuerySelected)?;
        if definition.field(name).is_none() {
            return Err(FormError::UnknownField {
                query: definition.id,
                field: name.to_owned(),
            });
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Fails on the first blank field in declaration order.
    pub fn validate(&self) -> Result<(), FormError> {
        let definition = self.selected.ok_or(FormError::NoQuerySelected)?;
        for field in definition.fields {
            let filled = self
                .values
                .get(field.name)
                .is_some_and(|value| !value.trim().is_empty());
            if !filled {
                return Err(FormError::MissingField { label: field.label });
            }
        }
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Submission, FormError> {
        if self.pending.is_some() {
            return Err(FormError::SubmissionPending);
        }
        let definition = self.selected.ok_or(FormError::NoQuerySelected)?;
        if let Err(error) = self.validate() {
            self.error = Some(error.to_string());
            return Err(error);
        }

        self.error = None;
        self.generation = self.generation.next();
        self.pending = Some(self.generation);
        Ok(Submission {
            generation: self.generation,
            query_id: definition.id,
            params: self.values.clone(),
        })
    }

    /// Settles the pending dispatch when `generation` is still current.
    /// Returns `false` for stale or unexpected generations.
    pub fn finish(&mut self, generation: RequestGeneration) -> bool {
        if self.pending != Some(generation) {
            return false;
        }
        self.pending = None;
        true
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}
