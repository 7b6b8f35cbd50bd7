//! Lazy walk over the groups of a sorted buffer.
//!
//! The walk keeps an explicit stack with one frame per key level instead
//! of nesting generators. Each frame remembers the end of its row range,
//! the next code to emit and where that code's rows start. Leaf cells
//! name a contiguous range of the sorted buffer, so the data itself is
//! never copied.

use std::ops::Range;

/// A terminal cell of the group space: one code per key level and the
/// rows of the sorted buffer that carry those codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCell {
    pub codes: Vec<usize>,
    pub range: Range<usize>,
}

impl GroupCell {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Frame {
    level: usize,
    end: usize,
    next_code: usize,
    left: usize,
}

/// Iterator over the cells of the group space in code order.
///
/// Rows with code -1 at some level sit before the valid codes of their
/// parent range and are skipped. With `skip_empty` unset, cells without
/// rows are emitted too; an empty range at an inner level still expands
/// into empty cells for every code below it.
#[derive(Debug, Clone)]
pub struct GroupSlicer<'a> {
    sorted_labels: &'a [Vec<i64>],
    shape: &'a [usize],
    stack: Vec<Frame>,
    prefix: Vec<usize>,
    skip_empty: bool,
}

impl<'a> GroupSlicer<'a> {
    pub fn new(
        sorted_labels: &'a [Vec<i64>],
        shape: &'a [usize],
        range: Range<usize>,
        skip_empty: bool,
    ) -> Self {
        let mut stack = Vec::with_capacity(shape.len());
        if let Some(first) = sorted_labels.first() {
            stack.push(Frame {
                level: 0,
                end: range.end,
                next_code: 0,
                left: first_valid(first, range.start, range.end),
            });
        }
        GroupSlicer {
            sorted_labels,
            shape,
            stack,
            prefix: Vec::with_capacity(shape.len()),
            skip_empty,
        }
    }
}

/// Start of the first row with a valid code in `[start, end)`
fn first_valid(labels: &[i64], start: usize, end: usize) -> usize {
    start + labels[start..end].partition_point(|&c| c < 0)
}

impl<'a> Iterator for GroupSlicer<'a> {
    type Item = GroupCell;

    fn next(&mut self) -> Option<GroupCell> {
        let n_levels = self.sorted_labels.len();

        loop {
            let frame = self.stack.last_mut()?;
            let level = frame.level;

            if frame.next_code >= self.shape[level] {
                self.stack.pop();
                if level > 0 {
                    self.prefix.pop();
                }
                continue;
            }

            let code = frame.next_code;
            frame.next_code += 1;

            let labels = &self.sorted_labels[level];
            let left = frame.left;
            let right = left + labels[left..frame.end].partition_point(|&c| c <= code as i64);
            frame.left = right;

            if right == left && self.skip_empty {
                continue;
            }

            if level + 1 == n_levels {
                let mut codes = self.prefix.clone();
                codes.push(code);
                log::trace!("group cell {:?}: rows {}..{}", codes, left, right);
                return Some(GroupCell {
                    codes,
                    range: left..right,
                });
            }

            let child = first_valid(&self.sorted_labels[level + 1], left, right);
            self.prefix.push(code);
            self.stack.push(Frame {
                level: level + 1,
                end: right,
                next_code: 0,
                left: child,
            });
        }
    }
}
