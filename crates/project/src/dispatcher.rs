use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared callback handle; identity is the pointer of the `Rc`.
pub type Callback = Rc<dyn Fn()>;

/// Payload-free change notifier used by directories and projects.
/// 無負載的變更通知器，供資料夾與專案使用。
///
/// Callbacks run synchronously in registration order. Registering the same
/// handle twice makes it run twice per dispatch.
pub struct EventDispatcher {
    name: &'static str,
    callbacks: RefCell<Vec<Callback>>,
}

impl EventDispatcher {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            callbacks: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers a callback and returns the handle needed to unregister it.
    /// 註冊回呼並回傳取消註冊所需的控制代碼。
    pub fn register(&self, callback: impl Fn() + 'static) -> Callback {
        let callback: Callback = Rc::new(callback);
        self.register_handle(callback.clone());
        callback
    }

    pub fn register_handle(&self, callback: Callback) {
        self.callbacks.borrow_mut().push(callback);
    }

    /// Removes one registration of `callback`; unknown handles are ignored.
    /// 移除一次 `callback` 的註冊；未註冊的代碼會被忽略。
    pub fn unregister(&self, callback: &Callback) {
        let mut callbacks = self.callbacks.borrow_mut();
        if let Some(index) = callbacks.iter().position(|cb| Rc::ptr_eq(cb, callback)) {
            callbacks.remove(index);
        }
    }

    /// Invokes every callback registered at the time of the call.
    /// 呼叫目前已註冊的所有回呼。
    pub fn dispatch(&self) {
        // Snapshot so callbacks may (un)register without re-borrowing.
        let snapshot: Vec<Callback> = self.callbacks.borrow().clone();
        tracing::trace!(dispatcher = self.name, callbacks = snapshot.len(), "dispatch");
        for callback in snapshot {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("name", &self.name)
            .field("callbacks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dispatch_runs_callbacks_in_registration_order() {
        let dispatcher = EventDispatcher::new("test");
        let order = Rc::new(RefCell::new(Vec::new()));
        for id in 0..3 {
            let order = order.clone();
            dispatcher.register(move || order.borrow_mut().push(id));
        }
        dispatcher.dispatch();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_registration_runs_twice_and_unregister_removes_one() {
        let dispatcher = EventDispatcher::new("test");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let handle = dispatcher.register(move || counter.set(counter.get() + 1));
        dispatcher.register_handle(handle.clone());

        dispatcher.dispatch();
        assert_eq!(hits.get(), 2);

        dispatcher.unregister(&handle);
        dispatcher.dispatch();
        assert_eq!(hits.get(), 3);
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn unregister_unknown_callback_is_noop() {
        let dispatcher = EventDispatcher::new("test");
        dispatcher.register(|| {});
        let stranger: Callback = Rc::new(|| {});
        dispatcher.unregister(&stranger);
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn callback_may_unregister_itself_during_dispatch() {
        let dispatcher = Rc::new(EventDispatcher::new("test"));
        let hits = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Callback>>> = Rc::new(RefCell::new(None));

        let handle = {
            let inner = dispatcher.clone();
            let hits = hits.clone();
            let slot = slot.clone();
            dispatcher.register(move || {
                hits.set(hits.get() + 1);
                if let Some(me) = slot.borrow_mut().take() {
                    inner.unregister(&me);
                }
            })
        };
        *slot.borrow_mut() = Some(handle);

        dispatcher.dispatch();
        dispatcher.dispatch();
        assert_eq!(hits.get(), 1);
        assert!(dispatcher.is_empty());
    }
}
