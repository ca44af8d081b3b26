//! Computes the minimal ordered set of texture samples and per-value read
//! indices required to satisfy `derives` for every value written in each
//! pass.

use crate::derive::{DeriveEntry, Derives};
use crate::error::{InvalidDeriveReason, PlanError};
use crate::grouper::GrouperOutput;

/// One texture fetch in a pass: `(stepAgo, textureIndex)`.
pub type Sample = (u32, usize);

/// Sample and read plans for every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerOutput {
    /// `samples[p]` is the deduplicated, first-seen-ordered list of
    /// samples a shader computing pass `p` must take.
    pub samples: Vec<Vec<Sample>>,
    /// `reads[p][v]` is `None` if value `v` isn't written in pass `p` (or
    /// has no derive); otherwise the ordered list of indices into
    /// `samples[p]`, one per normalized derive source.
    pub reads: Vec<Vec<Option<Vec<usize>>>>,
}

/// Computes [`SamplerOutput`] from a grouper's layout and the user's
/// `derives` relation.
///
/// `steps` and `bound` bound the valid `step_ago` range: every concrete
/// source must satisfy `step_ago in [0, steps - bound - 1]`.
pub fn plan_samples(
    grouper: &GrouperOutput,
    value_count: usize,
    derives: &Derives,
    steps: u32,
    bound: u32,
) -> Result<SamplerOutput, PlanError> {
    let mut samples = Vec::with_capacity(grouper.passes.len());
    let mut reads = Vec::with_capacity(grouper.passes.len());

    for pass_index in 0..grouper.passes.len() {
        let mut pass_samples: Vec<Sample> = Vec::new();
        let mut pass_reads: Vec<Option<Vec<usize>>> = vec![None; value_count];

        for v in 0..value_count {
            if grouper.value_to_pass[v] != pass_index {
                continue;
            }
            let Some(entries) = derives.get(v).and_then(|e| e.as_ref()) else {
                continue;
            };

            let mut idxs = Vec::with_capacity(entries.len());
            for (source_index, entry) in entries.iter().enumerate() {
                match *entry {
                    DeriveEntry::One { value, step_ago } => {
                        if value >= value_count {
                            return Err(PlanError::InvalidDerive {
                                pass_index,
                                value_index: v,
                                source_index,
                                reason: InvalidDeriveReason::UnknownValue {
                                    referenced: value,
                                    value_count,
                                },
                            });
                        }
                        validate_step_ago(steps, bound, step_ago).map_err(|reason| {
                            PlanError::InvalidDerive {
                                pass_index,
                                value_index: v,
                                source_index,
                                reason,
                            }
                        })?;
                        let texture_index = grouper.value_to_texture[value];
                        idxs.push(find_or_append(&mut pass_samples, (step_ago, texture_index)));
                    }
                    DeriveEntry::AllAtStep { step_ago } => {
                        validate_step_ago(steps, bound, step_ago).map_err(|reason| {
                            PlanError::InvalidDerive {
                                pass_index,
                                value_index: v,
                                source_index,
                                reason,
                            }
                        })?;
                        for ev in 0..value_count {
                            let texture_index = grouper.value_to_texture[ev];
                            idxs.push(find_or_append(
                                &mut pass_samples,
                                (step_ago, texture_index),
                            ));
                        }
                    }
                }
            }
            pass_reads[v] = Some(idxs);
        }

        log::trace!(
            "pass {pass_index}: {} samples, {} values read",
            pass_samples.len(),
            pass_reads.iter().filter(|r| r.is_some()).count()
        );
        samples.push(pass_samples);
        reads.push(pass_reads);
    }

    Ok(SamplerOutput { samples, reads })
}

fn find_or_append(samples: &mut Vec<Sample>, s: Sample) -> usize {
    if let Some(pos) = samples.iter().position(|&existing| existing == s) {
        pos
    } else {
        samples.push(s);
        samples.len() - 1
    }
}

fn validate_step_ago(steps: u32, bound: u32, step_ago: u32) -> Result<(), InvalidDeriveReason> {
    if bound >= steps {
        return Err(InvalidDeriveReason::ReadsBoundStep { step_ago, bound });
    }
    let max_step_ago = steps - bound - 1;
    if step_ago > max_step_ago {
        return Err(InvalidDeriveReason::StepAgoOutOfRange {
            step_ago,
            max_step_ago,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouper::{group, BuffersMax};
    use crate::value::Value;

    fn setup() -> GrouperOutput {
        let values = vec![Value::new(2), Value::new(4), Value::new(1)];
        let packed = vec![0, 1, 2];
        group(&values, &packed, 4, BuffersMax::Limit(1)).unwrap()
    }

    #[test]
    fn pass_with_single_explicit_source() {
        let grouper = setup();
        let derives: Derives = vec![
            Some(vec![DeriveEntry::One {
                value: 2,
                step_ago: 0,
            }]),
            None,
            None,
        ];
        let out = plan_samples(&grouper, 3, &derives, 2, 1).unwrap();
        assert_eq!(out.samples[0], vec![(0, 2)]);
        assert_eq!(out.reads[0], vec![Some(vec![0]), None, None]);
    }

    #[test]
    fn all_at_step_expands_and_dedupes_against_explicit_source() {
        let grouper = setup();
        let derives: Derives = vec![
            None,
            None,
            Some(vec![
                DeriveEntry::One {
                    value: 1,
                    step_ago: 0,
                },
                DeriveEntry::AllAtStep { step_ago: 0 },
            ]),
        ];
        let out = plan_samples(&grouper, 3, &derives, 2, 1).unwrap();
        // (0,1) from the explicit source, then (0,0) and (0,2) newly seen
        // during the all-at-step expansion; the expansion's own (0,1)
        // entry dedupes back to the explicit source's index.
        assert_eq!(out.samples[2], vec![(0, 1), (0, 0), (0, 2)]);
        assert_eq!(out.reads[2][2], Some(vec![0, 1, 0, 2]));
    }

    #[test]
    fn rejects_unknown_value_reference() {
        let grouper = setup();
        let derives: Derives = vec![
            Some(vec![DeriveEntry::One {
                value: 9,
                step_ago: 0,
            }]),
            None,
            None,
        ];
        let err = plan_samples(&grouper, 3, &derives, 2, 1).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidDerive {
                pass_index: 0,
                value_index: 0,
                source_index: 0,
                reason: InvalidDeriveReason::UnknownValue {
                    referenced: 9,
                    value_count: 3
                }
            }
        );
    }

    #[test]
    fn rejects_step_ago_past_oldest_readable() {
        let grouper = setup();
        // steps=2, bound=1 -> max_step_ago = 0; step_ago=1 is too old.
        let derives: Derives = vec![
            Some(vec![DeriveEntry::One {
                value: 1,
                step_ago: 1,
            }]),
            None,
            None,
        ];
        let err = plan_samples(&grouper, 3, &derives, 2, 1).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidDerive {
                pass_index: 0,
                value_index: 0,
                source_index: 0,
                reason: InvalidDeriveReason::StepAgoOutOfRange {
                    step_ago: 1,
                    max_step_ago: 0
                }
            }
        );
    }

    #[test]
    fn rejects_derive_when_bound_consumes_all_steps() {
        let grouper = setup();
        let derives: Derives = vec![
            Some(vec![DeriveEntry::One {
                value: 1,
                step_ago: 0,
            }]),
            None,
            None,
        ];
        let err = plan_samples(&grouper, 3, &derives, 2, 2).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidDerive {
                pass_index: 0,
                value_index: 0,
                source_index: 0,
                reason: InvalidDeriveReason::ReadsBoundStep {
                    step_ago: 0,
                    bound: 2
                }
            }
        );
    }
}
