//! Greedy best-fit-decreasing value packer.

use crate::error::PlanError;
use crate::value::Value;

/// Computes a storage-order permutation of value indices that packs values
/// into as few `channels_max`-wide blocks as possible.
///
/// Returns a list of original value indices in storage order. The identity
/// permutation (`0..values.len()`) is always a valid, if not always
/// optimal, choice; this function tries to do better by greedy
/// best-fit-decreasing.
pub fn pack(values: &[Value], channels_max: u8) -> Result<Vec<usize>, PlanError> {
    for (i, v) in values.iter().enumerate() {
        v.validate(i, channels_max)?;
    }

    let mut unpacked: Vec<usize> = (0..values.len()).collect();
    let mut packed = Vec::with_capacity(values.len());
    let mut channels_free = channels_max;

    while !unpacked.is_empty() {
        let mut pos = best_fit_position(&unpacked, values, channels_free);
        if pos.is_none() {
            // Nothing fits in the remainder of this texture; start a fresh one.
            channels_free = channels_max;
            pos = best_fit_position(&unpacked, values, channels_free);
        }
        let pos = pos.expect("every value satisfies 1 <= channels <= channels_max");
        let vi = unpacked.remove(pos);
        channels_free -= values[vi].channels;
        packed.push(vi);
        if channels_free == 0 {
            channels_free = channels_max;
        }
    }

    Ok(packed)
}

/// Scans `unpacked` for the value index (position within `unpacked`) whose
/// channel count leaves the smallest non-negative remainder in
/// `channels_free`. A perfect fit (remainder 0) wins immediately; ties are
/// broken by first-seen order.
fn best_fit_position(unpacked: &[usize], values: &[Value], channels_free: u8) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for (pos, &vi) in unpacked.iter().enumerate() {
        let c = values[vi].channels;
        if c > channels_free {
            continue;
        }
        let remainder = channels_free - c;
        if remainder == 0 {
            return Some(pos);
        }
        match best {
            Some((_, best_remainder)) if best_remainder <= remainder => {}
            _ => best = Some((pos, remainder)),
        }
    }
    best.map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vals(channels: &[u8]) -> Vec<Value> {
        channels.iter().map(|&c| Value::new(c)).collect()
    }

    #[test]
    fn empty_values_yields_empty_permutation() {
        assert_eq!(pack(&[], 4).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn single_max_channel_value() {
        let values = vals(&[4]);
        assert_eq!(pack(&values, 4).unwrap(), vec![0]);
    }

    #[test]
    fn best_fit_decreasing_packs_mismatched_channel_widths() {
        // values=[2,4,1], channelsMax=4 -> packed=[1,0,2].
        let values = vals(&[2, 4, 1]);
        assert_eq!(pack(&values, 4).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn five_singleton_channels_pack_into_one_texture_plus_remainder() {
        let values = vals(&[1, 1, 1, 1, 1]);
        let packed = pack(&values, 4).unwrap();
        assert_eq!(packed.len(), 5);
        let mut sorted = packed.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn rejects_channel_count_out_of_range() {
        let values = vals(&[0, 2]);
        assert_eq!(
            pack(&values, 4),
            Err(PlanError::InvalidValue {
                value_index: 0,
                channels: 0,
                channels_max: 4
            })
        );

        let values = vals(&[5]);
        assert_eq!(
            pack(&values, 4),
            Err(PlanError::InvalidValue {
                value_index: 0,
                channels: 5,
                channels_max: 4
            })
        );
    }
}
