use async_trait::async_trait;
use mqlite_client::invoke_by_name;
use mqlite_core::{
    property, CodecError, Fault, InterfaceDescriptor, Marshal, MethodSignature, RemoteObject,
    RpcError, Scalar, TypeSpec, Value,
};
use std::any::Any;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

pub const GREETER: &str = "demo.Greeter";
pub const RETURN_TYPES: &str = "demo.ReturnTypes";
pub const PARAM_TYPES: &str = "demo.ParamTypes";
pub const N_PARAMS: &str = "demo.NParams";
pub const REMOTE_OBJECTS: &str = "demo.RemoteObjects";
pub const IBEAN: &str = "demo.IBean";
pub const IBEAN_SERVER: &str = "demo.IBeanServer";

pub const BEAN_TYPE: &str = "demo.Bean";
pub const BEAN_SERVER_TYPE: &str = "demo.BeanServer";
pub const BEAN_WITHOUT_DEFAULT_TYPE: &str = "demo.BeanWithoutDefault";

const INT: TypeSpec = TypeSpec::Primitive(Scalar::Int);
const BOOLEAN: TypeSpec = TypeSpec::Primitive(Scalar::Bool);
const DOUBLE: TypeSpec = TypeSpec::Primitive(Scalar::Double);

fn getter(name: &str, returns: TypeSpec) -> MethodSignature {
    MethodSignature::new(name).returns(returns)
}

pub static GREETER_INTERFACE: LazyLock<InterfaceDescriptor> = LazyLock::new(|| {
    InterfaceDescriptor::new(GREETER).method(getter("getGreeting", TypeSpec::String))
});

pub static IBEAN_INTERFACE: LazyLock<InterfaceDescriptor> = LazyLock::new(|| {
    InterfaceDescriptor::new(IBEAN)
        .method(getter("getAge", INT))
        .method(getter("getName", TypeSpec::String))
        .method(getter("getTitle", TypeSpec::String))
        .method(getter("noSetterGetter", TypeSpec::String))
        .method(MethodSignature::new("setAge").param(INT))
        .method(MethodSignature::new("setName").param(TypeSpec::String))
        .method(MethodSignature::new("setTitle").param(TypeSpec::String))
});

pub static RETURN_TYPES_INTERFACE: LazyLock<InterfaceDescriptor> = LazyLock::new(|| {
    InterfaceDescriptor::new(RETURN_TYPES)
        .method(getter("beanReturn", TypeSpec::object(BEAN_TYPE)))
        .method(getter("booleanReturn", BOOLEAN))
        .method(getter("doubleReturn", DOUBLE))
        .method(getter(
            "getBeanWithoutDefaultConstructor",
            TypeSpec::object(BEAN_WITHOUT_DEFAULT_TYPE),
        ))
        .method(getter("helloWorld", TypeSpec::String))
        .method(getter("ibeanReturn", TypeSpec::interface(IBEAN)))
        .method(getter("intReturn", INT))
        .method(getter("nullReturn", TypeSpec::Any))
        .method(getter("stringReturn", TypeSpec::String))
        .method(getter("throwsException", TypeSpec::Any))
        .method(getter("voidReturn", TypeSpec::Void))
});

pub static IBEAN_SERVER_INTERFACE: LazyLock<InterfaceDescriptor> = LazyLock::new(|| {
    let string_param = |name: &str| {
        MethodSignature::new(name)
            .param(TypeSpec::String)
            .returns(TypeSpec::String)
    };
    InterfaceDescriptor::new(IBEAN_SERVER)
        .method(
            MethodSignature::new("beanParam")
                .param(TypeSpec::object(BEAN_SERVER_TYPE))
                .returns(TypeSpec::object(BEAN_SERVER_TYPE)),
        )
        .method(MethodSignature::new("booleanParam").param(BOOLEAN).returns(TypeSpec::String))
        .method(MethodSignature::new("doubleParam").param(DOUBLE).returns(TypeSpec::String))
        .method(getter("getSomeField", TypeSpec::String))
        .method(
            MethodSignature::new("ibeanParam")
                .param(TypeSpec::interface(IBEAN_SERVER))
                .returns(TypeSpec::interface(IBEAN_SERVER)),
        )
        .method(MethodSignature::new("integerParam").param(INT).returns(TypeSpec::String))
        .method(string_param("nullParam"))
        .method(MethodSignature::new("setSomeField").param(TypeSpec::String))
        .method(string_param("stringParam"))
});

pub static PARAM_TYPES_INTERFACE: LazyLock<InterfaceDescriptor> = LazyLock::new(|| {
    InterfaceDescriptor::new(PARAM_TYPES)
        .method(getter("getBeanServer", TypeSpec::object(BEAN_SERVER_TYPE)))
        .method(getter("getIBeanServer", TypeSpec::interface(IBEAN_SERVER)))
});

pub static N_PARAMS_INTERFACE: LazyLock<InterfaceDescriptor> = LazyLock::new(|| {
    InterfaceDescriptor::new(N_PARAMS)
        .method(getter("methodWithZeroParams", TypeSpec::String))
        .method(
            MethodSignature::new("methodWithOneParams")
                .param(TypeSpec::String)
                .returns(TypeSpec::String),
        )
        .method(
            MethodSignature::new("methodWithThreeParams")
                .param(TypeSpec::String)
                .param(TypeSpec::String)
                .param(TypeSpec::String)
                .returns(TypeSpec::String),
        )
});

pub static REMOTE_OBJECTS_INTERFACE: LazyLock<InterfaceDescriptor> = LazyLock::new(|| {
    InterfaceDescriptor::new(REMOTE_OBJECTS)
        .method(
            MethodSignature::new("getMeBackTheRemote")
                .param(TypeSpec::interface(IBEAN))
                .returns(TypeSpec::interface(IBEAN)),
        )
        .method(getter("ibeanReturn", TypeSpec::interface(IBEAN)))
});

/// Every interface the fixtures use.
pub fn all_interfaces() -> Vec<InterfaceDescriptor> {
    [
        &GREETER_INTERFACE,
        &IBEAN_INTERFACE,
        &RETURN_TYPES_INTERFACE,
        &IBEAN_SERVER_INTERFACE,
        &PARAM_TYPES_INTERFACE,
        &N_PARAMS_INTERFACE,
        &REMOTE_OBJECTS_INTERFACE,
    ]
    .into_iter()
    .map(|descriptor| (**descriptor).clone())
    .collect()
}

fn arg<T>(args: &[Value], index: usize) -> Result<T, Fault>
where
    T: TryFrom<Value, Error = CodecError>,
{
    let value = args.get(index).cloned().unwrap_or(Value::Null);
    T::try_from(value).map_err(|err| Fault::illegal_argument(err.to_string()))
}

fn unknown(method: &MethodSignature, object: &dyn RemoteObject) -> Fault {
    Fault::method_not_found(&method.name, object.type_name())
}

fn to_fault(err: RpcError) -> Fault {
    match err {
        RpcError::Remote { kind, message } => Fault::new(kind, message),
        other => Fault::internal(other.to_string()),
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct Greeter;

#[async_trait]
impl RemoteObject for Greeter {
    fn type_name(&self) -> &str {
        "demo.GreeterImpl"
    }

    fn implements(&self, interface: &str) -> bool {
        interface == GREETER
    }

    fn methods(&self) -> &[MethodSignature] {
        GREETER_INTERFACE.methods()
    }

    async fn invoke(&self, method: &MethodSignature, _args: Vec<Value>) -> Result<Value, Fault> {
        match method.name.as_str() {
            "getGreeting" => Ok(Value::from("Hello World")),
            _ => Err(unknown(method, self)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeanState {
    pub name: Option<String>,
    pub age: i32,
    pub title: Option<String>,
    pub no_setter_getter: Option<String>,
}

/// Exposable as `demo.IBean` by reference, and marshalable by value.
/// `NoSetterGetter` is readable only, so it does not survive a by-value trip.
#[derive(Debug, Default)]
pub struct Bean {
    state: Mutex<BeanState>,
}

impl Bean {
    pub fn new(name: &str, age: i32, title: &str) -> Self {
        Bean {
            state: Mutex::new(BeanState {
                name: Some(name.to_string()),
                age,
                title: Some(title.to_string()),
                no_setter_getter: Some("NoSetterGetter".to_string()),
            }),
        }
    }

    pub fn state(&self) -> BeanState {
        locked(&self.state).clone()
    }
}

impl Marshal for Bean {
    fn type_name(&self) -> &str {
        BEAN_TYPE
    }

    fn properties(&self) -> Vec<(String, Value)> {
        let state = self.state();
        vec![
            ("Age".into(), Value::Int(state.age)),
            ("Name".into(), Value::from(state.name)),
            ("Title".into(), Value::from(state.title)),
            ("NoSetterGetter".into(), Value::from(state.no_setter_getter)),
        ]
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<bool, CodecError> {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        match name {
            "Age" => state.age = property(BEAN_TYPE, name, value)?,
            "Name" => state.name = property(BEAN_TYPE, name, value)?,
            "Title" => state.title = property(BEAN_TYPE, name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl RemoteObject for Bean {
    fn type_name(&self) -> &str {
        BEAN_TYPE
    }

    fn implements(&self, interface: &str) -> bool {
        interface == IBEAN
    }

    fn methods(&self) -> &[MethodSignature] {
        IBEAN_INTERFACE.methods()
    }

    async fn invoke(&self, method: &MethodSignature, args: Vec<Value>) -> Result<Value, Fault> {
        let mut state = locked(&self.state);
        match method.name.as_str() {
            "getAge" => Ok(Value::Int(state.age)),
            "getName" => Ok(Value::from(state.name.clone())),
            "getTitle" => Ok(Value::from(state.title.clone())),
            "noSetterGetter" => Ok(Value::from(state.no_setter_getter.clone())),
            "setAge" => {
                state.age = arg(&args, 0)?;
                Ok(Value::Null)
            }
            "setName" => {
                state.name = arg(&args, 0)?;
                Ok(Value::Null)
            }
            "setTitle" => {
                state.title = arg(&args, 0)?;
                Ok(Value::Null)
            }
            _ => Err(unknown(method, self)),
        }
    }

    fn by_value(&self) -> Option<Arc<dyn Marshal>> {
        Some(Arc::new(Bean {
            state: Mutex::new(self.state()),
        }))
    }
}

/// A by-value type the receiving side cannot construct.
#[derive(Debug)]
pub struct BeanWithoutDefault {
    pub name: String,
}

impl Marshal for BeanWithoutDefault {
    fn type_name(&self) -> &str {
        BEAN_WITHOUT_DEFAULT_TYPE
    }

    fn properties(&self) -> Vec<(String, Value)> {
        vec![("Name".into(), Value::from(self.name.as_str()))]
    }

    fn set_property(&mut self, _name: &str, _value: Value) -> Result<bool, CodecError> {
        Ok(false)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct ReturnTypes;

#[async_trait]
impl RemoteObject for ReturnTypes {
    fn type_name(&self) -> &str {
        "demo.ReturnTypesImpl"
    }

    fn implements(&self, interface: &str) -> bool {
        interface == RETURN_TYPES
    }

    fn methods(&self) -> &[MethodSignature] {
        RETURN_TYPES_INTERFACE.methods()
    }

    async fn invoke(&self, method: &MethodSignature, _args: Vec<Value>) -> Result<Value, Fault> {
        match method.name.as_str() {
            "beanReturn" => Ok(Value::Ref(Arc::new(Bean::new("JMSLite", 2, "Software")))),
            "booleanReturn" => Ok(Value::Bool(true)),
            "doubleReturn" => Ok(Value::Double(1810.1810)),
            "getBeanWithoutDefaultConstructor" => Ok(Value::object(BeanWithoutDefault {
                name: "SomeName".into(),
            })),
            "helloWorld" => Ok(Value::from("Hello World")),
            "ibeanReturn" => Ok(Value::Ref(Arc::new(Bean::new("JMSLite", 2, "Software")))),
            "intReturn" => Ok(Value::Int(1810)),
            "nullReturn" | "voidReturn" => Ok(Value::Null),
            "stringReturn" => Ok(Value::from("1810")),
            "throwsException" => Err(Fault::new(
                "IllegalAccessException",
                "We do not expect this function to return a value",
            )),
            _ => Err(unknown(method, self)),
        }
    }
}

/// Exposable as `demo.IBeanServer` by reference, and marshalable by value.
#[derive(Debug, Default)]
pub struct BeanServer {
    some_field: Mutex<Option<String>>,
}

impl BeanServer {
    pub fn with_field(value: Option<String>) -> Self {
        BeanServer {
            some_field: Mutex::new(value),
        }
    }

    pub fn some_field(&self) -> Option<String> {
        locked(&self.some_field).clone()
    }
}

impl Marshal for BeanServer {
    fn type_name(&self) -> &str {
        BEAN_SERVER_TYPE
    }

    fn properties(&self) -> Vec<(String, Value)> {
        vec![("SomeField".into(), Value::from(self.some_field()))]
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<bool, CodecError> {
        match name {
            "SomeField" => {
                *self.some_field.get_mut().unwrap_or_else(PoisonError::into_inner) =
                    property(BEAN_SERVER_TYPE, name, value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl RemoteObject for BeanServer {
    fn type_name(&self) -> &str {
        BEAN_SERVER_TYPE
    }

    fn implements(&self, interface: &str) -> bool {
        interface == IBEAN_SERVER
    }

    fn methods(&self) -> &[MethodSignature] {
        IBEAN_SERVER_INTERFACE.methods()
    }

    async fn invoke(&self, method: &MethodSignature, args: Vec<Value>) -> Result<Value, Fault> {
        match method.name.as_str() {
            "beanParam" => {
                let field = match args.first() {
                    None | Some(Value::Null) => None,
                    Some(value) => match value.downcast_object::<BeanServer>() {
                        Some(bean) => bean.some_field(),
                        None => return Err(Fault::illegal_argument("expected a BeanServer")),
                    },
                };
                Ok(Value::object(BeanServer::with_field(field)))
            }
            "booleanParam" => Ok(Value::from(format!("Boolean:{}", arg::<bool>(&args, 0)?))),
            "doubleParam" => Ok(Value::from(format!("Double:{}", arg::<f64>(&args, 0)?))),
            "integerParam" => Ok(Value::from(format!("Integer:{}", arg::<i32>(&args, 0)?))),
            "stringParam" => Ok(Value::from(format!(
                "String:{}",
                arg::<Option<String>>(&args, 0)?.unwrap_or_default()
            ))),
            "nullParam" => Ok(Value::from(match arg::<Option<String>>(&args, 0)? {
                None => "Null Param",
                Some(_) => "Not Null",
            })),
            "getSomeField" => Ok(Value::from(self.some_field())),
            "setSomeField" => {
                *locked(&self.some_field) = arg(&args, 0)?;
                Ok(Value::Null)
            }
            "ibeanParam" => {
                let other = match args.into_iter().next() {
                    Some(Value::Ref(other)) => other,
                    _ => return Err(Fault::illegal_argument("expected an IBeanServer")),
                };
                let reply = invoke_by_name(other.as_ref(), "getSomeField", vec![])
                    .await
                    .map_err(to_fault)?;
                let field = Option::<String>::try_from(reply)
                    .map_err(|err| Fault::illegal_argument(err.to_string()))?;
                Ok(Value::Ref(Arc::new(BeanServer::with_field(field))))
            }
            _ => Err(unknown(method, self)),
        }
    }

    fn by_value(&self) -> Option<Arc<dyn Marshal>> {
        Some(Arc::new(BeanServer::with_field(self.some_field())))
    }
}

#[derive(Debug, Default)]
pub struct ParamTypes;

#[async_trait]
impl RemoteObject for ParamTypes {
    fn type_name(&self) -> &str {
        "demo.ParamTypesImpl"
    }

    fn implements(&self, interface: &str) -> bool {
        interface == PARAM_TYPES
    }

    fn methods(&self) -> &[MethodSignature] {
        PARAM_TYPES_INTERFACE.methods()
    }

    async fn invoke(&self, method: &MethodSignature, _args: Vec<Value>) -> Result<Value, Fault> {
        match method.name.as_str() {
            "getBeanServer" | "getIBeanServer" => Ok(Value::Ref(Arc::new(BeanServer::default()))),
            _ => Err(unknown(method, self)),
        }
    }
}

#[derive(Debug, Default)]
pub struct NParams;

#[async_trait]
impl RemoteObject for NParams {
    fn type_name(&self) -> &str {
        "demo.NParamsImpl"
    }

    fn implements(&self, interface: &str) -> bool {
        interface == N_PARAMS
    }

    fn methods(&self) -> &[MethodSignature] {
        N_PARAMS_INTERFACE.methods()
    }

    async fn invoke(&self, method: &MethodSignature, args: Vec<Value>) -> Result<Value, Fault> {
        let strings = args
            .into_iter()
            .map(|a| Option::<String>::try_from(a).map(Option::unwrap_or_default))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| Fault::illegal_argument(err.to_string()))?;
        let mut parts = vec![method.name.clone()];
        parts.extend(strings);
        Ok(Value::from(parts.join(":")))
    }
}

/// Hands out one long-lived bean and echoes references back.
#[derive(Debug)]
pub struct RemoteObjects {
    bean: Arc<Bean>,
}

impl Default for RemoteObjects {
    fn default() -> Self {
        RemoteObjects {
            bean: Arc::new(Bean::new("JMSLite", 2, "Software")),
        }
    }
}

impl RemoteObjects {
    pub fn bean(&self) -> &Arc<Bean> {
        &self.bean
    }
}

#[async_trait]
impl RemoteObject for RemoteObjects {
    fn type_name(&self) -> &str {
        "demo.RemoteObjectsImpl"
    }

    fn implements(&self, interface: &str) -> bool {
        interface == REMOTE_OBJECTS
    }

    fn methods(&self) -> &[MethodSignature] {
        REMOTE_OBJECTS_INTERFACE.methods()
    }

    async fn invoke(&self, method: &MethodSignature, args: Vec<Value>) -> Result<Value, Fault> {
        match method.name.as_str() {
            "getMeBackTheRemote" => Ok(args.into_iter().next().unwrap_or(Value::Null)),
            "ibeanReturn" => Ok(Value::Ref(Arc::clone(&self.bean) as Arc<dyn RemoteObject>)),
            _ => Err(unknown(method, self)),
        }
    }
}

/// Typed view over a `demo.IBean` reference, local or remote.
#[derive(Debug, Clone)]
pub struct BeanRef(pub Arc<dyn RemoteObject>);

impl BeanRef {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        invoke_by_name(self.0.as_ref(), method, args).await
    }

    pub async fn get_name(&self) -> Result<Option<String>, RpcError> {
        Ok(self.call("getName", vec![]).await?.try_into()?)
    }

    pub async fn get_age(&self) -> Result<i32, RpcError> {
        Ok(self.call("getAge", vec![]).await?.try_into()?)
    }

    pub async fn get_title(&self) -> Result<Option<String>, RpcError> {
        Ok(self.call("getTitle", vec![]).await?.try_into()?)
    }

    pub async fn no_setter_getter(&self) -> Result<Option<String>, RpcError> {
        Ok(self.call("noSetterGetter", vec![]).await?.try_into()?)
    }

    pub async fn set_name(&self, name: &str) -> Result<(), RpcError> {
        self.call("setName", vec![Value::from(name)]).await.map(drop)
    }
}

/// Typed view over a `demo.IBeanServer` reference.
#[derive(Debug, Clone)]
pub struct BeanServerRef(pub Arc<dyn RemoteObject>);

impl BeanServerRef {
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        invoke_by_name(self.0.as_ref(), method, args).await
    }

    pub async fn string_call(&self, method: &str, args: Vec<Value>) -> Result<Option<String>, RpcError> {
        Ok(self.call(method, args).await?.try_into()?)
    }

    pub async fn bean_param(&self, bean: BeanServer) -> Result<Option<String>, RpcError> {
        let result = self.call("beanParam", vec![Value::object(bean)]).await?;
        result
            .downcast_object::<BeanServer>()
            .map(BeanServer::some_field)
            .ok_or_else(|| RpcError::Protocol(format!("expected a BeanServer, got {}", result.kind_name())))
    }

    pub async fn ibean_param(&self, bean: Arc<dyn RemoteObject>) -> Result<BeanServerRef, RpcError> {
        match self.call("ibeanParam", vec![Value::Ref(bean)]).await? {
            Value::Ref(object) => Ok(BeanServerRef(object)),
            other => Err(RpcError::Protocol(format!("expected a reference, got {}", other.kind_name()))),
        }
    }
}
