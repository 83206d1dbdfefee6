// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! What callbacks can see of a parse in progress.

use crate::slot::ValueSlot;

/// A callback's view of the parse in progress.
pub struct ParseContext<'a> {
    pub(crate) names: &'a [String],
    pub(crate) slots: &'a [Box<dyn ValueSlot>],
    pub(crate) help_requested: &'a mut bool,
}

impl ParseContext<'_> {
    fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    /// Whether the argument called `name` has been bound so far.
    pub fn is_bound(&self, name: &str) -> bool {
        self.index(name).is_some_and(|index| self.slots[index].is_bound())
    }

    /// The value bound so far to `name`, as the argument's output type.
    ///
    /// `None` if nothing is bound or `C` is not the output type.
    pub fn value<C: 'static>(&self, name: &str) -> Option<&C> {
        let index = self.index(name)?;
        self.slots[index].current()?.downcast_ref::<C>()
    }

    /// Whether help has been requested.
    pub fn help_requested(&self) -> bool {
        *self.help_requested
    }

    /// Ask for help to be shown. Usually paired with returning `false` to
    /// cancel parsing.
    pub fn request_help(&mut self) {
        self.set_help_requested(true);
    }

    /// Set or clear the help request.
    pub fn set_help_requested(&mut self, requested: bool) {
        *self.help_requested = requested;
    }
}
