use crate::ops::error::{element_count, LoweringError, LoweringResult};

/// Resolves the single inferred (negative) entry of `target` against `source`.
///
/// With no inferred entry the element counts must already agree and `target` is returned as
/// is. A known product of zero cannot resolve an inferred entry and is reported as a mismatch.
pub fn complete_shape(target: &[i64], source: &[usize]) -> LoweringResult<Vec<usize>> {
    let mut incomplete: Option<usize> = None;
    let mut dims = Vec::with_capacity(target.len());
    for (idx, &size) in target.iter().enumerate() {
        if size < 0 {
            if let Some(first) = incomplete {
                return Err(LoweringError::MultipleIncompleteDimensions { first, second: idx });
            }
            incomplete = Some(idx);
            dims.push(1);
        } else {
            let size = usize::try_from(size).map_err(|_| LoweringError::ElementCountOverflow {
                dims: dims.clone(),
            })?;
            dims.push(size);
        }
    }

    let total = element_count(source)?;
    let known = element_count(&dims)?;
    let mismatch = || LoweringError::ShapeElementCountMismatch {
        requested: target.to_vec(),
        input: source.to_vec(),
    };

    match incomplete {
        None if known == total => Ok(dims),
        None => Err(mismatch()),
        Some(_) if known == 0 || total % known != 0 => Err(mismatch()),
        Some(idx) => {
            dims[idx] = total / known;
            Ok(dims)
        }
    }
}
