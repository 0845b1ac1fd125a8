use std::{any::Any, fmt, thread};

pub struct CaughtPanic(pub Box<dyn Any + Send + 'static>);

pub struct FinishedWorker<T> {
    pub name: String,
    pub result: Result<T, CaughtPanic>,
}

/// Runs `work` on every item, each on its own named scoped thread, and waits for all of
/// them. The results are in the same order as `items`. A panicking worker does not take
/// the others down with it.
pub fn scoped_workers<I, T, F>(
    name: impl AsRef<str>,
    items: impl IntoIterator<Item = I>,
    work: F,
) -> Vec<FinishedWorker<T>>
where
    I: Send,
    T: Send,
    F: Fn(I) -> T + Sync,
{
    let name = name.as_ref();
    let work = &work;
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let name = format!("{name}{index:>02}");
                let handle = thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || work(item))
                    .expect("the name does not contain null bytes");
                (name, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| FinishedWorker {
                name,
                result: handle.join().map_err(CaughtPanic),
            })
            .collect()
    })
}

impl fmt::Display for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let panic = &self.0;
        let string = panic
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| {
                format!("non-string panic message: {:?}", panic.type_id())
            });
        write!(f, "{string}")
    }
}

impl fmt::Debug for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaughtPanic({self})")
    }
}
