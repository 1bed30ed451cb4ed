//! The two external capabilities a dispatcher drives: the module loader that
//! turns an init payload into an export table, and the entry-point table that
//! runs requests against those exports.
//!
//! Both run on the worker's own event loop, so their futures need not be
//! `Send`. Synchronous entry points simply return without awaiting.

use std::rc::Rc;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{InvokeError, LoadError};

#[async_trait(?Send)]
pub trait ModuleLoader: 'static {
    /// Shared module, shared memory and thread context, opaque to the worker.
    type Payload: 'static;
    type Exports: 'static;

    async fn initialize(&self, payload: Self::Payload) -> Result<Self::Exports, LoadError>;
}

#[async_trait(?Send)]
pub trait EntryPointTable: 'static {
    type Exports: 'static;
    type Request: 'static;

    async fn invoke(
        &self,
        exports: &Self::Exports,
        request: Self::Request,
    ) -> Result<(), InvokeError>;
}

#[async_trait(?Send)]
impl<L: ModuleLoader + ?Sized> ModuleLoader for Arc<L> {
    type Payload = L::Payload;
    type Exports = L::Exports;

    async fn initialize(&self, payload: Self::Payload) -> Result<Self::Exports, LoadError> {
        (**self).initialize(payload).await
    }
}

#[async_trait(?Send)]
impl<L: ModuleLoader + ?Sized> ModuleLoader for Rc<L> {
    type Payload = L::Payload;
    type Exports = L::Exports;

    async fn initialize(&self, payload: Self::Payload) -> Result<Self::Exports, LoadError> {
        (**self).initialize(payload).await
    }
}

#[async_trait(?Send)]
impl<T: EntryPointTable + ?Sized> EntryPointTable for Arc<T> {
    type Exports = T::Exports;
    type Request = T::Request;

    async fn invoke(
        &self,
        exports: &Self::Exports,
        request: Self::Request,
    ) -> Result<(), InvokeError> {
        (**self).invoke(exports, request).await
    }
}

#[async_trait(?Send)]
impl<T: EntryPointTable + ?Sized> EntryPointTable for Rc<T> {
    type Exports = T::Exports;
    type Request = T::Request;

    async fn invoke(
        &self,
        exports: &Self::Exports,
        request: Self::Request,
    ) -> Result<(), InvokeError> {
        (**self).invoke(exports, request).await
    }
}
