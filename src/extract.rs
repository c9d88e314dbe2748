use crate::config::TargetSpec;
use crate::utils::error::{AppError, Result};

/// Cuts the target text out of a fetched page.
///
/// The label is anchored at its **last** occurrence in the page, since
/// the markers these checks rely on tend to sit near the bottom of the
/// document. The result starts `spec.offset` bytes after the end of
/// the label and runs for `spec.length` bytes.
///
/// A blank page or an empty label means the upstream fetch did not
/// return a usable document, reported as `TargetNotFound`. A slice
/// falling outside the page is a configuration mistake and reported as
/// `TargetOutOfRange`, never truncated or padded.
pub fn extract(page_text: &str, spec: &TargetSpec) -> Result<String> {
    if spec.label.is_empty() || page_text.trim().is_empty() {
        return Err(AppError::TargetNotFound {
            label: spec.label.clone(),
            url: spec.url.clone(),
        });
    }

    let found = page_text.rfind(&spec.label).ok_or_else(|| AppError::TargetNotFound {
        label: spec.label.clone(),
        url: spec.url.clone(),
    })?;

    let out_of_range = || AppError::TargetOutOfRange {
        url: spec.url.clone(),
        offset: spec.offset,
        length: spec.length,
    };

    let start = (found + spec.label.len()) as i64 + spec.offset;
    let start = usize::try_from(start).map_err(|_| out_of_range())?;
    let end = start.checked_add(spec.length).ok_or_else(out_of_range)?;

    // get() also rejects slices that split a UTF-8 character.
    let target = page_text.get(start..end).ok_or_else(out_of_range)?;
    Ok(target.to_string())
}
