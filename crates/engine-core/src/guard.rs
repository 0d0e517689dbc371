use crate::error::RetrievalError;
use model::core::identifiers::IndexSelector;

pub fn validate_indices(indices: &IndexSelector) -> Result<(), RetrievalError> {
    if indices.is_empty() {
        return Err(RetrievalError::invalid(
            "Provide at least one index or index alias name",
        ));
    }
    Ok(())
}

/// Page sizes run from 1 to `max`; a zero page would never look exhausted.
pub fn validate_page_size(size: usize, max: usize) -> Result<(), RetrievalError> {
    if size == 0 {
        return Err(RetrievalError::invalid("Size must be at least 1"));
    }
    if size > max {
        return Err(RetrievalError::invalid(format!(
            "Size must not be greater than {max}"
        )));
    }
    Ok(())
}
