//! Operand stack shared by the charstring and DICT interpreters.

use crate::{
    blend::{BlendGroup, CapturedBlend},
    config::MAX_STACK,
    error::{FormatError, InterpretationError, Result},
};

/// Operand stack with per-slot links to captured blend groups.
///
/// Values pushed by a blend operator are the group's base; `blends[i]`
/// holds the index of the capture that produced slot `i`.
#[derive(Debug, Default)]
pub(crate) struct Stack {
    values: Vec<f64>,
    blends: Vec<Option<usize>>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn len_is_odd(&self) -> bool {
        self.values.len() & 1 != 0
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn blends(&self) -> &[Option<usize>] {
        &self.blends
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.blends.clear();
    }

    pub fn push(&mut self, value: f64, offset: usize) -> std::result::Result<(), InterpretationError> {
        if self.values.len() >= MAX_STACK {
            return Err(InterpretationError::StackOverflow { offset });
        }
        self.values.push(value);
        self.blends.push(None);
        Ok(())
    }

    pub fn pop(&mut self, offset: usize) -> std::result::Result<f64, InterpretationError> {
        self.blends.pop();
        self.values.pop().ok_or(InterpretationError::StackUnderflow { offset })
    }

    /// Moves the stack contents to the end of `values`/`blends`, leaving it empty.
    pub fn drain_into(&mut self, values: &mut Vec<f64>, blends: &mut Vec<Option<usize>>) {
        values.append(&mut self.values);
        blends.append(&mut self.blends);
    }

    /// Applies a blend operator: `g0 .. g(K-1) K N blend` with each group
    /// laid out as `base d1 .. dN`.
    ///
    /// Pushes each base back and appends one [`CapturedBlend`] per group to
    /// `captured`. `consumed_before` is the number of operands consumed by
    /// earlier operators, used to place captures in the flattened operand
    /// stream.
    pub fn apply_blend(
        &mut self,
        axis_count: usize,
        offset: usize,
        captured: &mut Vec<CapturedBlend>,
        consumed_before: usize,
    ) -> Result<()> {
        let n = self.pop_count(offset)?;
        let k = self.pop_count(offset)?;
        if n != axis_count {
            return Err(FormatError::AxisCountMismatch { expected: axis_count, actual: n, offset }.into());
        }
        let needed = k
            .checked_mul(n + 1)
            .ok_or(InterpretationError::StackUnderflow { offset })?;
        if needed > self.values.len() {
            return Err(InterpretationError::StackUnderflow { offset }.into());
        }
        let start = self.values.len() - needed;
        if self.blends[start..].iter().any(Option::is_some) {
            return Err(InterpretationError::NestedBlend { offset }.into());
        }
        let groups: Vec<BlendGroup> = self.values[start..]
            .chunks_exact(n + 1)
            .map(|chunk| BlendGroup {
                base: chunk[0],
                deltas: chunk[1..].to_vec(),
                axis_count: n,
            })
            .collect();
        self.values.truncate(start);
        self.blends.truncate(start);
        for group in groups {
            let stack_index = self.values.len();
            self.values.push(group.base);
            self.blends.push(Some(captured.len()));
            captured.push(CapturedBlend {
                group,
                stack_index,
                operand_index: consumed_before + stack_index,
            });
        }
        Ok(())
    }

    /// Pops a blend count operand, which must be a non-negative integer.
    fn pop_count(&mut self, offset: usize) -> Result<usize> {
        let count = self.pop(offset)?;
        if count < 0.0 || count.fract() != 0.0 || count > MAX_STACK as f64 {
            return Err(InterpretationError::InvalidBlendCount { count, offset }.into());
        }
        Ok(count as usize)
    }
}
