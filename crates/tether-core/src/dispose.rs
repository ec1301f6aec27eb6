//! Cancellation group: a scope that collectively cancels its pending
//! requests on dismissal, and dismisses itself on drop. The group holds
//! weak handles only; it never extends a request's lifetime.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::Request;

#[derive(Default)]
pub struct DisposeGroup {
    requests: RefCell<Vec<Weak<Request>>>,
}

impl DisposeGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, request: &Rc<Request>) {
        self.requests.borrow_mut().push(Rc::downgrade(request));
    }

    /// Remove `request` by identity; dead entries are pruned on the way.
    pub fn remove(&self, request: &Rc<Request>) {
        self.requests.borrow_mut().retain(|weak| match weak.upgrade() {
            Some(live) => !Rc::ptr_eq(&live, request),
            None => false,
        });
    }

    /// Cancel every still-live member and clear the group.
    pub fn dismiss(&self) {
        let requests = self.requests.take();
        debug!(size = requests.len(), "dismiss");
        for weak in requests {
            if let Some(request) = weak.upgrade() {
                request.cancel();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.borrow().is_empty()
    }
}

impl Drop for DisposeGroup {
    fn drop(&mut self) {
        self.dismiss();
    }
}
