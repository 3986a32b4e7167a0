//! Combine-latest stream combinator.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};

/// Stream returned by [`combine_latest`].
#[must_use = "streams do nothing unless polled"]
pub struct CombineLatest<A: Stream, B: Stream> {
    a: Option<A>,
    b: Option<B>,
    latest_a: Option<A::Item>,
    latest_b: Option<B::Item>,
}

// Buffered items are only ever moved, never pinned.
impl<A: Stream + Unpin, B: Stream + Unpin> Unpin for CombineLatest<A, B> {}

/// Pairs the latest items of `a` and `b`.
///
/// Emits once both sides have produced an item, then again whenever either
/// side produces one. Ends when both sides ended, or as soon as one side ends
/// without ever having produced an item.
pub fn combine_latest<A, B>(a: A, b: B) -> CombineLatest<A, B>
where
    A: Stream + Unpin,
    B: Stream + Unpin,
    A::Item: Clone,
    B::Item: Clone,
{
    CombineLatest {
        a: Some(a),
        b: Some(b),
        latest_a: None,
        latest_b: None,
    }
}

fn poll_side<S: Stream + Unpin>(
    side: &mut Option<S>,
    latest: &mut Option<S::Item>,
    cx: &mut Context<'_>,
) -> bool {
    let Some(stream) = side.as_mut() else {
        return false;
    };
    match stream.poll_next_unpin(cx) {
        Poll::Ready(Some(item)) => {
            *latest = Some(item);
            true
        }
        Poll::Ready(None) => {
            *side = None;
            false
        }
        Poll::Pending => false,
    }
}

impl<A, B> Stream for CombineLatest<A, B>
where
    A: Stream + Unpin,
    B: Stream + Unpin,
    A::Item: Clone,
    B::Item: Clone,
{
    type Item = (A::Item, B::Item);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let updated_a = poll_side(&mut this.a, &mut this.latest_a, cx);
        let updated_b = poll_side(&mut this.b, &mut this.latest_b, cx);

        if updated_a || updated_b {
            if let (Some(a), Some(b)) = (&this.latest_a, &this.latest_b) {
                return Poll::Ready(Some((a.clone(), b.clone())));
            }
        }

        let a_done = this.a.is_none();
        let b_done = this.b.is_none();
        if (a_done && b_done)
            || (a_done && this.latest_a.is_none())
            || (b_done && this.latest_b.is_none())
        {
            return Poll::Ready(None);
        }

        if updated_a || updated_b {
            // One side is still waiting for its first item; poll again so
            // the other side's waker stays registered.
            cx.waker().wake_by_ref();
        }
        Poll::Pending
    }
}
