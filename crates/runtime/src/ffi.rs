// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! C ABI over [`EngineContext`].
//!
//! Every function is prefixed `gb_`. Failures return `-1` (or null for
//! pointer results) and leave a message in a thread-local slot readable via
//! [`gb_last_error`]. Successful calls clear the slot.
//!
//! Buffers and lengths are passed as pointer + count pairs and are only
//! read or written for the duration of the call. Indices and lengths are
//! `size_t`. Shape buffers hold `int64_t` dimensions, batch first.
//!
//! ```c
//! gb_engine *ctx = gb_engine_create(1);
//! int64_t shape[4] = {1, 3, 224, 224};
//! gb_engine_register_input(ctx, "data", shape, 4, 1);
//! if (gb_engine_initialize_native(ctx, init, init_len, pred, pred_len) != 0)
//!     fprintf(stderr, "%s\n", gb_last_error());
//! ```

use crate::{EngineContext, RuntimeError};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn write_error(err: impl std::fmt::Display) {
    let message = CString::new(err.to_string().replace('\0', "\\0")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn clear_error() {
    LAST_ERROR.with(|slot| {
        slot.borrow_mut().take();
    });
}

fn status(result: Result<(), RuntimeError>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => {
            write_error(e);
            -1
        }
    }
}

fn count(result: Result<usize, RuntimeError>) -> c_int {
    match result {
        Ok(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
        Err(e) => {
            write_error(e);
            -1
        }
    }
}

fn byte_count(result: Result<usize, RuntimeError>) -> i64 {
    match result {
        Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
        Err(e) => {
            write_error(e);
            -1
        }
    }
}

// ── Argument conversion ────────────────────────────────────────

unsafe fn context<'a>(ctx: *const EngineContext) -> Result<&'a EngineContext, RuntimeError> {
    ctx.as_ref().ok_or(RuntimeError::NullArgument("ctx"))
}

unsafe fn context_mut<'a>(ctx: *mut EngineContext) -> Result<&'a mut EngineContext, RuntimeError> {
    ctx.as_mut().ok_or(RuntimeError::NullArgument("ctx"))
}

unsafe fn str_arg<'a>(s: *const c_char, what: &'static str) -> Result<&'a str, RuntimeError> {
    if s.is_null() {
        return Err(RuntimeError::NullArgument(what));
    }
    let c = CStr::from_ptr(s);
    c.to_str()
        .map_err(|_| RuntimeError::InvalidName(c.to_string_lossy().into_owned()))
}

/// Slices may span at most `isize::MAX` bytes.
fn check_len<T>(len: usize, what: &'static str) -> Result<(), RuntimeError> {
    let max = isize::MAX as usize / std::mem::size_of::<T>().max(1);
    if len > max {
        return Err(RuntimeError::LengthOverflow { what, len });
    }
    Ok(())
}

unsafe fn slice_arg<'a, T>(
    ptr: *const T,
    len: usize,
    what: &'static str,
) -> Result<&'a [T], RuntimeError> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(RuntimeError::NullArgument(what));
    }
    check_len::<T>(len, what)?;
    Ok(std::slice::from_raw_parts(ptr, len))
}

unsafe fn slice_arg_mut<'a, T>(
    ptr: *mut T,
    len: usize,
    what: &'static str,
) -> Result<&'a mut [T], RuntimeError> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(RuntimeError::NullArgument(what));
    }
    check_len::<T>(len, what)?;
    Ok(std::slice::from_raw_parts_mut(ptr, len))
}

// ── Lifecycle ──────────────────────────────────────────────────

/// Creates a context. Never returns null.
///
/// A non-zero `use_accelerator` requests an accelerator; the context falls
/// back to the host when none is present.
#[no_mangle]
pub extern "C" fn gb_engine_create(use_accelerator: c_int) -> *mut EngineContext {
    clear_error();
    Box::into_raw(Box::new(EngineContext::create(use_accelerator != 0)))
}

/// Destroys a context and every tensor it owns. Null is ignored.
///
/// # Safety
/// `ctx` must be null or a pointer returned by [`gb_engine_create`] that
/// has not been destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_destroy(ctx: *mut EngineContext) {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx));
    }
}

/// Returns 1 if the context runs on an accelerator, 0 if on the host.
///
/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_uses_accelerator(ctx: *const EngineContext) -> c_int {
    clear_error();
    count(context(ctx).map(|c| usize::from(c.uses_accelerator())))
}

/// Initializes from two native serialized nets.
///
/// # Safety
/// `ctx` must be a live context; `init`/`pred` must point to at least
/// `init_len`/`pred_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_initialize_native(
    ctx: *mut EngineContext,
    init: *const c_void,
    init_len: usize,
    pred: *const c_void,
    pred_len: usize,
) -> c_int {
    clear_error();
    status((|| {
        let ctx = context_mut(ctx)?;
        let init = slice_arg(init.cast::<u8>(), init_len, "init")?;
        let pred = slice_arg(pred.cast::<u8>(), pred_len, "pred")?;
        ctx.initialize_from_native(init, pred)
    })())
}

/// Initializes from a serialized interchange model.
///
/// # Safety
/// `ctx` must be a live context; `model` must point to at least
/// `model_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_initialize_interchange(
    ctx: *mut EngineContext,
    model: *const c_void,
    model_len: usize,
) -> c_int {
    clear_error();
    status((|| {
        let ctx = context_mut(ctx)?;
        let model = slice_arg(model.cast::<u8>(), model_len, "model")?;
        ctx.initialize_from_interchange(model)
    })())
}

/// Registers an input before initialize.
///
/// # Safety
/// `ctx` must be a live context, `name` a NUL-terminated string and
/// `shape` must point to `rank` aligned `int64_t` values.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_register_input(
    ctx: *mut EngineContext,
    name: *const c_char,
    shape: *const i64,
    rank: usize,
    dtype: c_int,
) -> c_int {
    clear_error();
    status((|| {
        let ctx = context_mut(ctx)?;
        let name = str_arg(name, "name")?;
        let shape = slice_arg(shape, rank, "shape")?;
        ctx.register_input(name, shape, dtype).map(drop)
    })())
}

// ── Metadata ───────────────────────────────────────────────────

/// Number of registered inputs.
///
/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_input_count(ctx: *const EngineContext) -> c_int {
    clear_error();
    count(context(ctx).map(EngineContext::input_count))
}

/// Number of discovered outputs.
///
/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_output_count(ctx: *const EngineContext) -> c_int {
    clear_error();
    count(context(ctx).map(EngineContext::output_count))
}

unsafe fn name_at(
    ctx: *const EngineContext,
    index: usize,
    kind: &'static str,
    pick: fn(&EngineContext, usize) -> Option<&CStr>,
) -> *const c_char {
    clear_error();
    let result = context(ctx).and_then(|c| {
        pick(c, index).ok_or(RuntimeError::IndexOutOfRange {
            kind,
            index,
            count: if kind == "input" {
                c.input_count()
            } else {
                c.output_count()
            },
        })
    });
    match result {
        Ok(name) => name.as_ptr(),
        Err(e) => {
            write_error(e);
            ptr::null()
        }
    }
}

/// Name of input `index`, or null.
///
/// The string is owned by the context and valid until it is destroyed.
///
/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_input_name(
    ctx: *const EngineContext,
    index: usize,
) -> *const c_char {
    name_at(ctx, index, "input", EngineContext::input_c_name)
}

/// Name of output `index`, or null.
///
/// The string is owned by the context and valid until it is destroyed.
///
/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_output_name(
    ctx: *const EngineContext,
    index: usize,
) -> *const c_char {
    name_at(ctx, index, "output", EngineContext::output_c_name)
}

/// Index of output `name`, or -1.
///
/// # Safety
/// `ctx` must be null or a live context; `name` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_output_index(
    ctx: *const EngineContext,
    name: *const c_char,
) -> c_int {
    clear_error();
    count((|| {
        let ctx = context(ctx)?;
        let name = str_arg(name, "name")?;
        ctx.get_output_index(name).ok_or_else(|| RuntimeError::UnknownName {
            kind: "output",
            name: name.to_string(),
        })
    })())
}

/// Dtype tag of input or output `name`, or -1.
///
/// # Safety
/// `ctx` must be null or a live context; `name` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_dtype(
    ctx: *const EngineContext,
    name: *const c_char,
) -> c_int {
    clear_error();
    let result = (|| {
        let ctx = context(ctx)?;
        let name = str_arg(name, "name")?;
        ctx.dtype(name).ok_or_else(|| RuntimeError::UnknownName {
            kind: "tensor",
            name: name.to_string(),
        })
    })();
    match result {
        Ok(dtype) => dtype.tag(),
        Err(e) => {
            write_error(e);
            -1
        }
    }
}

/// Element width in bytes of input or output `name`, or -1.
///
/// # Safety
/// `ctx` must be null or a live context; `name` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_itemsize(
    ctx: *const EngineContext,
    name: *const c_char,
) -> c_int {
    clear_error();
    count((|| {
        let ctx = context(ctx)?;
        let name = str_arg(name, "name")?;
        ctx.itemsize(name).ok_or_else(|| RuntimeError::UnknownName {
            kind: "tensor",
            name: name.to_string(),
        })
    })())
}

/// Copies the last recorded shape of `name` into `out` and returns the rank.
///
/// With a null `out` only the rank is returned. Otherwise `out_len` must
/// equal the rank.
///
/// # Safety
/// `ctx` must be null or a live context; `name` null or NUL-terminated;
/// `out` null or pointing to `out_len` writable `int64_t` values.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_dimensions(
    ctx: *const EngineContext,
    name: *const c_char,
    out: *mut i64,
    out_len: usize,
) -> c_int {
    clear_error();
    count((|| {
        let ctx = context(ctx)?;
        let name = str_arg(name, "name")?;
        if out.is_null() {
            return Ok(ctx.dims(name)?.len());
        }
        ctx.get_dimensions(name, slice_arg_mut(out, out_len, "out")?)
    })())
}

// ── Serving ────────────────────────────────────────────────────

/// Copies a batch of `element_count` elements into input `name`.
///
/// `buf` is read as `element_count * itemsize(name)` bytes and need not be
/// aligned. `shape[1..]` must match the registered per-item shape.
///
/// # Safety
/// `ctx` must be a live context; `name` NUL-terminated; `buf` readable for
/// the byte count above; `shape` pointing to `rank` aligned `int64_t`.
#[no_mangle]
pub unsafe extern "C" fn gb_set_input_batch(
    ctx: *mut EngineContext,
    name: *const c_char,
    buf: *const c_void,
    element_count: usize,
    shape: *const i64,
    rank: usize,
) -> c_int {
    clear_error();
    status((|| {
        let ctx = context_mut(ctx)?;
        let name = str_arg(name, "name")?;
        let itemsize = ctx.itemsize(name).ok_or_else(|| RuntimeError::UnknownName {
            kind: "input",
            name: name.to_string(),
        })?;
        let len = element_count
            .checked_mul(itemsize)
            .ok_or(RuntimeError::LengthOverflow {
                what: "buf",
                len: element_count,
            })?;
        let bytes = slice_arg(buf.cast::<u8>(), len, "buf")?;
        let shape = slice_arg(shape, rank, "shape")?;
        ctx.set_input_batch(name, bytes, element_count, shape)
    })())
}

/// Runs the prediction net once.
///
/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn gb_execute_batch(ctx: *mut EngineContext) -> c_int {
    clear_error();
    status(context_mut(ctx).and_then(EngineContext::execute))
}

/// Byte size of output `index`, or -1.
///
/// # Safety
/// `ctx` must be null or a live context.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_output_size(ctx: *const EngineContext, index: usize) -> i64 {
    clear_error();
    byte_count(context(ctx).and_then(|c| c.get_output_size(index)))
}

/// Copies output `index` into `out` and its dimensions into `shape`.
///
/// Returns the number of bytes written, or -1. `rank` must equal the
/// output's rank and `out_capacity` must cover its size; otherwise nothing
/// is written.
///
/// # Safety
/// `ctx` must be a live context; `out` writable for `out_capacity` bytes;
/// `shape` pointing to `rank` writable, aligned `int64_t`.
#[no_mangle]
pub unsafe extern "C" fn gb_engine_get_output(
    ctx: *mut EngineContext,
    index: usize,
    out: *mut c_void,
    out_capacity: usize,
    shape: *mut i64,
    rank: usize,
) -> i64 {
    clear_error();
    byte_count((|| {
        let ctx = context_mut(ctx)?;
        let out = slice_arg_mut(out.cast::<u8>(), out_capacity, "out")?;
        let shape = slice_arg_mut(shape, rank, "shape")?;
        ctx.get_output(index, out, shape)
    })())
}

/// Message of the last failure on this thread, or null.
///
/// The pointer stays valid until the next `gb_` call on the same thread.
#[no_mangle]
pub extern "C" fn gb_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(ptr::null(), |s| s.as_ptr()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: &[u8] = b"x\0";
    const Y: &[u8] = b"y\0";

    fn last_error() -> String {
        let p = gb_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_null_context() {
        unsafe {
            assert_eq!(gb_engine_uses_accelerator(ptr::null()), -1);
            assert!(last_error().contains("ctx"));
            assert_eq!(gb_execute_batch(ptr::null_mut()), -1);
            assert_eq!(gb_engine_get_output_size(ptr::null(), 0), -1);
            assert!(gb_engine_get_input_name(ptr::null(), 0).is_null());
            gb_engine_destroy(ptr::null_mut());
        }
    }

    #[test]
    fn test_create_register_and_query() {
        unsafe {
            let ctx = gb_engine_create(1);
            assert!(!ctx.is_null());
            assert_eq!(gb_engine_uses_accelerator(ctx), 0);

            let shape = [1i64, 4];
            assert_eq!(gb_engine_register_input(ctx, X.as_ptr().cast(), shape.as_ptr(), 2, 1), 0);
            assert!(gb_last_error().is_null());
            assert_eq!(gb_engine_register_input(ctx, X.as_ptr().cast(), shape.as_ptr(), 2, 1), -1);
            assert!(last_error().contains("already registered"));

            assert_eq!(gb_engine_get_input_count(ctx), 1);
            let name = CStr::from_ptr(gb_engine_get_input_name(ctx, 0));
            assert_eq!(name.to_str().unwrap(), "x");
            assert!(gb_engine_get_input_name(ctx, 1).is_null());

            assert_eq!(gb_engine_get_dtype(ctx, X.as_ptr().cast()), 1);
            assert_eq!(gb_engine_get_itemsize(ctx, X.as_ptr().cast()), 4);
            assert_eq!(gb_engine_get_dimensions(ctx, X.as_ptr().cast(), ptr::null_mut(), 0), 2);
            let mut dims = [0i64; 2];
            assert_eq!(gb_engine_get_dimensions(ctx, X.as_ptr().cast(), dims.as_mut_ptr(), 2), 2);
            assert_eq!(dims, [1, 4]);
            assert_eq!(gb_engine_get_dimensions(ctx, X.as_ptr().cast(), dims.as_mut_ptr(), 1), -1);
            assert_eq!(gb_engine_get_output_index(ctx, Y.as_ptr().cast()), -1);

            gb_engine_destroy(ctx);
        }
    }

    #[test]
    fn test_null_buffers_with_length_rejected() {
        unsafe {
            let ctx = gb_engine_create(0);
            assert_eq!(gb_engine_initialize_native(ctx, ptr::null(), 4, ptr::null(), 0), -1);
            assert!(last_error().contains("init"));
            gb_engine_destroy(ctx);
        }
    }

    #[test]
    fn test_oversized_lengths_rejected() {
        unsafe {
            let ctx = gb_engine_create(0);
            let shape = [1i64, 2];
            assert_eq!(
                gb_engine_register_input(ctx, X.as_ptr().cast(), shape.as_ptr(), usize::MAX, 1),
                -1
            );
            assert!(last_error().contains("too large"));
            assert_eq!(gb_engine_get_input_count(ctx), 0);
            gb_engine_destroy(ctx);
        }
        assert!(check_len::<u8>(isize::MAX as usize, "buf").is_ok());
        assert!(check_len::<i64>(isize::MAX as usize / 8 + 1, "shape").is_err());
    }

    #[test]
    fn test_error_with_nul_is_escaped() {
        write_error("a\0b");
        assert_eq!(last_error(), "a\\0b");
        clear_error();
        assert!(gb_last_error().is_null());
    }
}
