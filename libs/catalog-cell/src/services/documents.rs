use std::collections::BTreeSet;

use crate::models::{DocumentChecklist, DocumentRequirement, DocumentValidation, Service};

pub fn checklist(service: &Service) -> DocumentChecklist {
    let mandatory_count = service
        .documents
        .iter()
        .filter(|doc| doc.requirement == DocumentRequirement::Mandatory)
        .count();

    DocumentChecklist {
        service_id: service.id,
        service_name: service.name.clone(),
        documents: service.documents.clone(),
        required_documents: service.required_documents.clone(),
        mandatory_count,
        optional_count: service.documents.len() - mandatory_count,
        minimum_required: service.minimum_documents(),
        total_documents: service.total_documents(),
    }
}

/// Check a citizen's document selection against the service checklist.
/// Duplicate and blank entries are not counted.
pub fn validate_selection(service: &Service, selected: &[String]) -> DocumentValidation {
    let unique: BTreeSet<String> = selected
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    let unique: Vec<String> = unique.into_iter().collect();

    let missing_mandatory = service
        .documents
        .iter()
        .filter(|doc| doc.requirement == DocumentRequirement::Mandatory)
        .filter(|doc| !doc.satisfied_by(&unique))
        .map(|doc| doc.name.clone())
        .collect();

    let minimum_required = service.minimum_documents();

    DocumentValidation {
        selected: unique.len(),
        minimum_required,
        meets_minimum: unique.len() >= minimum_required,
        missing_mandatory,
    }
}
