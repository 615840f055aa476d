#![allow(dead_code)]

pub mod fixtures {
    use brrtlogic::logic::{Decorated, LogicFn, LogicRef, Reply, Signature};
    use brrtlogic::typed::{array, boolean, integer, string, ParamType, TypeRef};
    use serde_json::{json, Value};

    pub fn name() -> TypeRef {
        string("name").min_length(1).into_ref()
    }

    pub fn age() -> TypeRef {
        integer("age").minimum(1).maximum(120).into_ref()
    }

    pub fn is_alive() -> TypeRef {
        boolean("Is alive?").into_ref()
    }

    pub fn foo_id() -> TypeRef {
        integer("foo id").into_ref()
    }

    pub fn foo() -> TypeRef {
        string("foo").into_ref()
    }

    pub fn foos() -> TypeRef {
        array("foos").items(foo()).into_ref()
    }

    pub fn delete_foo() -> LogicRef {
        LogicFn::new("delete_foo", Signature::new().param("foo_id", foo_id()), |_| {
            Ok(Reply::Value(Value::Null))
        })
        .into_ref()
    }

    pub fn get_foo() -> LogicRef {
        LogicFn::new(
            "get_foo",
            Signature::new()
                .param("name", name())
                .param("age", age())
                .optional("is_alive", is_alive(), json!(true))
                .returns(foo()),
            |call| {
                let name: String = call.get("name")?;
                let age: i64 = call.get("age")?;
                Ok(Reply::from(json!(format!("{name} is {age}"))))
            },
        )
        .into_ref()
    }

    pub fn get_foos() -> LogicRef {
        LogicFn::new(
            "get_foos",
            Signature::new()
                .optional("is_alive", is_alive(), json!(true))
                .returns(foos()),
            |_| Ok(Reply::from(json!(["a", "b"]))),
        )
        .into_ref()
    }

    pub fn create_foo() -> LogicRef {
        LogicFn::new(
            "create_foo",
            Signature::new().param("name", name()).returns(foo()),
            |call| Ok(Reply::from(json!(call.get::<String>("name")?))),
        )
        .into_ref()
    }

    pub fn update_foo() -> LogicRef {
        LogicFn::new(
            "update_foo",
            Signature::new()
                .param("foo_id", foo_id())
                .param("name", name())
                .optional("is_alive", is_alive(), json!(true))
                .returns(foo()),
            |call| Ok(Reply::from(json!(call.get::<String>("name")?))),
        )
        .into_ref()
    }

    pub fn no_params() -> LogicRef {
        LogicFn::new("no_params", Signature::new().returns(foo()), |_| {
            Ok(Reply::from(json!("")))
        })
        .into_ref()
    }

    /// `decorated_func(extra, name, is_alive=True)` wrapped by a layer that
    /// supplies `extra` itself.
    pub fn decorated_func() -> LogicRef {
        let inner = LogicFn::new(
            "decorated_func",
            Signature::new()
                .untyped("extra")
                .param("name", name())
                .optional("is_alive", is_alive(), json!(true))
                .returns(foo()),
            |call| {
                let extra: String = call.get("extra")?;
                let name: String = call.get("name")?;
                Ok(Reply::from(json!(format!("{extra} {name}"))))
            },
        )
        .into_ref();
        Decorated::new(inner, |inner, mut call| {
            call.params.insert("extra".to_string(), json!("extra!"));
            inner.call(call)
        })
        .into_ref()
    }
}

pub mod logs {
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};
    use tracing::subscriber::DefaultGuard;
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory log sink for asserting on emitted records.
    #[derive(Clone, Default)]
    pub struct LogCapture {
        buf: Arc<Mutex<Vec<u8>>>,
    }

    impl LogCapture {
        /// Capture everything at DEBUG and above on the current thread until
        /// the guard drops.
        pub fn install() -> (Self, DefaultGuard) {
            let capture = Self::default();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(capture.clone())
                .with_ansi(false)
                .with_max_level(Level::DEBUG)
                .finish();
            let guard = tracing::subscriber::set_default(subscriber);
            (capture, guard)
        }

        pub fn contents(&self) -> String {
            let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&buf).into_owned()
        }

        /// Lines containing `needle`.
        pub fn lines_with(&self, needle: &str) -> Vec<String> {
            self.contents()
                .lines()
                .filter(|l| l.contains(needle))
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for LogCapture {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}
