//! Lending hardware to an interrupt handler through a static.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A static slot through which thread code hands a `T` to an interrupt
/// handler, and can later take it back.
///
/// Access is guarded by a flag rather than a real lock: every attempt to get
/// at the contents either succeeds immediately or fails. Nothing here ever
/// spins, since an interrupt handler that spun on a lock held by the code it
/// preempted would spin forever.
#[derive(Debug)]
pub struct IsrLoan<T> {
    busy: AtomicBool,
    contents: UnsafeCell<Option<T>>,
}

unsafe impl<T: Send> Sync for IsrLoan<T> {}

/// Reasons a loan operation failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoanError {
    /// Someone else has the contents right now.
    Busy,
    /// Nothing has been donated.
    Empty,
    /// Something has already been donated and not reclaimed.
    Occupied,
}

impl<T> IsrLoan<T> {
    pub const fn new() -> Self {
        IsrLoan {
            busy: AtomicBool::new(false),
            contents: UnsafeCell::new(None),
        }
    }
}

impl<T: Send> IsrLoan<T> {
    /// Claims the slot itself, empty or not.
    fn claim(&self) -> Result<Claim<'_, T>, LoanError> {
        if self.busy.swap(true, Ordering::Acquire) {
            return Err(LoanError::Busy);
        }
        Ok(Claim {
            release: Release(&self.busy),
            // Safety: we observed the false->true transition of `busy`, so
            // nobody else can hold a reference into `contents` until we
            // store false again, which `Release` does on drop.
            contents: unsafe { &mut *self.contents.get() },
        })
    }

    /// Places `value` in the slot.
    ///
    /// On failure, `value` is handed back along with the reason.
    pub fn donate(&self, value: T) -> Result<(), (LoanError, T)> {
        let claim = match self.claim() {
            Ok(c) => c,
            Err(e) => return Err((e, value)),
        };
        if claim.contents.is_some() {
            return Err((LoanError::Occupied, value));
        }
        *claim.contents = Some(value);
        Ok(())
    }

    /// Takes the contents back out of the slot.
    pub fn reclaim(&self) -> Result<T, LoanError> {
        self.claim()?.contents.take().ok_or(LoanError::Empty)
    }

    /// Gets exclusive access to the contents, without waiting. Access ends
    /// when the returned guard is dropped.
    pub fn borrow(&self) -> Result<LoanGuard<'_, T>, LoanError> {
        let Claim { release, contents } = self.claim()?;
        match contents.as_mut() {
            Some(contents) => Ok(LoanGuard {
                _release: release,
                contents,
            }),
            None => Err(LoanError::Empty),
        }
    }

    /// Like `borrow`, for use from the interrupt handler that the contents
    /// were lent to.
    ///
    /// # Panics
    ///
    /// If the contents are missing or already borrowed. Either means the
    /// interrupt was enabled before its hardware was donated, or that some
    /// other code is holding on to that hardware. Both are wiring bugs.
    pub fn acquire(&self) -> LoanGuard<'_, T> {
        match self.borrow() {
            Ok(guard) => guard,
            Err(LoanError::Empty) => panic!("ISR fired without HW available"),
            Err(_) => panic!("HW lock held at ISR"),
        }
    }
}

/// Raw claim on the slot, including the `None` case.
struct Claim<'a, T> {
    release: Release<'a>,
    contents: &'a mut Option<T>,
}

/// Exclusive access to lent contents.
#[must_use = "if dropped, the contents are immediately released"]
pub struct LoanGuard<'a, T> {
    _release: Release<'a>,
    contents: &'a mut T,
}

/// Clears the busy flag on drop. Kept apart from the types that hold it so
/// that they can be taken apart and reassembled.
struct Release<'a>(&'a AtomicBool);

impl<'a> Drop for Release<'a> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<'a, T> core::ops::Deref for LoanGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.contents
    }
}

impl<'a, T> core::ops::DerefMut for LoanGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_donated() {
        let loan: IsrLoan<u32> = IsrLoan::new();
        assert_eq!(loan.borrow().err(), Some(LoanError::Empty));
        assert_eq!(loan.reclaim(), Err(LoanError::Empty));

        loan.donate(7).unwrap();
        assert_eq!(*loan.borrow().unwrap(), 7);
    }

    #[test]
    fn borrow_is_exclusive() {
        let loan = IsrLoan::new();
        loan.donate(1u8).unwrap();
        {
            let mut guard = loan.borrow().unwrap();
            *guard += 1;
            assert_eq!(loan.borrow().err(), Some(LoanError::Busy));
            assert_eq!(loan.donate(9), Err((LoanError::Busy, 9)));
            assert_eq!(loan.reclaim(), Err(LoanError::Busy));
        }
        // Released on drop.
        assert_eq!(*loan.acquire(), 2);
    }

    #[test]
    fn no_double_donation() {
        let loan = IsrLoan::new();
        loan.donate("tim4").unwrap();
        assert_eq!(loan.donate("tim5"), Err((LoanError::Occupied, "tim5")));
        assert_eq!(loan.reclaim(), Ok("tim4"));
        assert_eq!(loan.reclaim(), Err(LoanError::Empty));
        loan.donate("tim5").unwrap();
    }

    #[test]
    #[should_panic(expected = "without HW")]
    fn acquire_before_donation_panics() {
        let loan: IsrLoan<()> = IsrLoan::new();
        let _ = loan.acquire();
    }

    #[test]
    #[should_panic(expected = "lock held")]
    fn reentrant_acquire_panics() {
        let loan = IsrLoan::new();
        loan.donate(()).unwrap();
        let _outer = loan.acquire();
        let _inner = loan.acquire();
    }
}
