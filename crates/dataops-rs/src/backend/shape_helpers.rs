//! Shared shape helpers used by the lowering layer and backends.

/// Computes `product(dims)` with overflow checking.
pub fn checked_element_count_or_error<E, F>(dims: &[usize], mut on_overflow: F) -> Result<usize, E>
where
    F: FnMut() -> E,
{
    let mut count = 1usize;
    for dim in dims {
        count = count.checked_mul(*dim).ok_or_else(&mut on_overflow)?;
    }
    Ok(count)
}

/// Builds row-major contiguous strides with overflow checking.
pub fn contiguous_strides_or_error<E, F>(
    dims: &[usize],
    mut on_overflow: F,
) -> Result<Vec<usize>, E>
where
    F: FnMut() -> E,
{
    let mut strides = vec![0usize; dims.len()];
    let mut stride = 1usize;
    for axis in (0..dims.len()).rev() {
        strides[axis] = stride;
        stride = stride
            .checked_mul(dims[axis])
            .ok_or_else(&mut on_overflow)?;
    }
    Ok(strides)
}

/// Inserts a size-1 dimension at `dim`, or `None` when `dim > dims.len()`.
pub fn insert_unit_dim(dims: &[usize], dim: usize) -> Option<Vec<usize>> {
    if dim > dims.len() {
        return None;
    }
    let mut out = Vec::with_capacity(dims.len() + 1);
    out.extend_from_slice(&dims[..dim]);
    out.push(1);
    out.extend_from_slice(&dims[dim..]);
    Some(out)
}

/// Left-pads `dims` with 1s up to `rank`. Returns `dims` unchanged when already long enough.
pub fn left_pad_dims(dims: &[usize], rank: usize) -> Vec<usize> {
    let missing = rank.saturating_sub(dims.len());
    let mut out = vec![1usize; missing];
    out.extend_from_slice(dims);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_are_row_major() {
        let strides = contiguous_strides_or_error(&[2, 3, 4], || ()).unwrap();
        assert_eq!(strides, vec![12, 4, 1]);
    }

    #[test]
    fn element_count_reports_overflow() {
        let result = checked_element_count_or_error(&[usize::MAX, 2], || "overflow");
        assert_eq!(result, Err("overflow"));
    }

    #[test]
    fn unit_dim_and_left_pad() {
        assert_eq!(insert_unit_dim(&[2, 3], 1), Some(vec![2, 1, 3]));
        assert_eq!(insert_unit_dim(&[2, 3], 2), Some(vec![2, 3, 1]));
        assert_eq!(left_pad_dims(&[3], 3), vec![1, 1, 3]);
        assert_eq!(left_pad_dims(&[2, 3], 1), vec![2, 3]);
    }
}
