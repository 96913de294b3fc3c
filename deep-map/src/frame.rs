use std::convert::Infallible;

use crate::value::Value;

/// A single 'frame' containing values that can be mapped over via `map_frame`.
///
/// Implemented for a marker token, because rust does not allow implementing a trait
/// for a partially applied type like `CompositeFrame`. The convention is to implement
/// it over `CompositeFrame<PartiallyApplied>`, using the uninhabited [`PartiallyApplied`]
/// marker, eg
///
/// ```rust
/// # use deep_map::{CompositeFrame, MappableFrame, PartiallyApplied, Value};
/// let frame = CompositeFrame::Array(vec![1i64, 2]);
/// let mapped = CompositeFrame::<PartiallyApplied>::map_frame(frame, |n| Value::Int(n * 10));
///
/// assert!(matches!(mapped, CompositeFrame::Array(items) if items == vec![Value::Int(10), Value::Int(20)]));
/// ```
pub trait MappableFrame {
    /// the frame type that is mapped over by `map_frame`
    type Frame<X>;

    /// Apply some function `f` to each element inside a frame, in member order
    fn map_frame<A, B>(input: Self::Frame<A>, f: impl FnMut(A) -> B) -> Self::Frame<B>;
}

/// An uninhabited type used to define [`MappableFrame`] instances for partially-applied types.
#[derive(Clone, Debug)]
pub enum PartiallyApplied {}

/// One layer of a [`Value`]: a scalar leaf, or a composite whose members are `X`.
#[derive(Debug, Clone)]
pub enum CompositeFrame<X> {
    /// never holds `Value::Composite`
    Leaf(Value),
    Array(Vec<X>),
    Object(Vec<(String, X)>),
}

impl MappableFrame for CompositeFrame<PartiallyApplied> {
    type Frame<X> = CompositeFrame<X>;

    #[inline(always)]
    fn map_frame<A, B>(input: Self::Frame<A>, mut f: impl FnMut(A) -> B) -> Self::Frame<B> {
        match input {
            CompositeFrame::Leaf(scalar) => CompositeFrame::Leaf(scalar),
            CompositeFrame::Array(items) => CompositeFrame::Array(items.into_iter().map(f).collect()),
            CompositeFrame::Object(entries) => CompositeFrame::Object(
                entries
                    .into_iter()
                    .map(|(name, member)| (name, f(member)))
                    .collect(),
            ),
        }
    }
}

/// Expand some seed into frames via `Seed -> Frame<Seed>` and collapse them back
/// via `Frame<Out> -> Out`, depth first, left to right.
///
/// This function is stack safe (it does not use the call stack), but it does use
/// an internal stack data structure. It only terminates for tree-shaped expansions:
/// a seed that eventually expands into itself will loop forever.
pub fn expand_and_collapse<F: MappableFrame, Seed, Out>(
    seed: Seed,
    mut expand_frame: impl FnMut(Seed) -> F::Frame<Seed>,
    mut collapse_frame: impl FnMut(F::Frame<Out>) -> Out,
) -> Out {
    let res = try_expand_and_collapse::<F, Seed, Out, Infallible>(
        seed,
        |seed| Ok(expand_frame(seed)),
        |frame| Ok(collapse_frame(frame)),
    );
    match res {
        Ok(out) => out,
        Err(never) => match never {},
    }
}

/// Fallible [`expand_and_collapse`]: the first error from either function aborts
/// the traversal and is returned as-is.
pub fn try_expand_and_collapse<F: MappableFrame, Seed, Out, E>(
    seed: Seed,
    mut expand_frame: impl FnMut(Seed) -> Result<F::Frame<Seed>, E>,
    mut collapse_frame: impl FnMut(F::Frame<Out>) -> Result<Out, E>,
) -> Result<Out, E> {
    enum State<Seed, Pending> {
        Expand(usize, Seed),
        Collapse(usize, Pending),
    }

    let mut vals: Vec<Option<Out>> = vec![None];
    let mut stack = vec![State::Expand(0, seed)];

    while let Some(item) = stack.pop() {
        match item {
            State::Expand(val_idx, seed) => {
                let frame = expand_frame(seed)?;
                let mut seeds = Vec::new();
                let frame = F::map_frame(frame, |seed| {
                    vals.push(None);
                    let idx = vals.len() - 1;
                    seeds.push(State::Expand(idx, seed));
                    idx
                });

                stack.push(State::Collapse(val_idx, frame));
                // reversed so the leftmost seed is popped first
                stack.extend(seeds.into_iter().rev());
            }
            State::Collapse(val_idx, frame) => {
                let frame = F::map_frame(frame, |idx| {
                    vals[idx]
                        .take()
                        .expect("child frames collapse before their parent")
                });
                vals[val_idx] = Some(collapse_frame(frame)?);
            }
        };
    }
    Ok(vals[0].take().expect("root frame collapsed"))
}
