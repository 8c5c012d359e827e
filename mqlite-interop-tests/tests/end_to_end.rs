// End-to-end tests
// Two endpoints on one in-memory broker, driven through proxies

use mqlite_client::invoke_by_name;
use mqlite_core::{kinds, RemoteObject, RpcError, Value};
use mqlite_interop_tests::fixtures::{
    Bean, BeanServer, GREETER, N_PARAMS, PARAM_TYPES, REMOTE_OBJECTS, RETURN_TYPES,
};
use mqlite_interop_tests::{BeanRef, BeanServerRef, Pair};
use std::sync::Arc;
use std::time::Duration;

async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

async fn call(object: &Arc<dyn RemoteObject>, method: &str, args: Vec<Value>) -> Value {
    invoke_by_name(object.as_ref(), method, args).await.unwrap()
}

fn reference(value: Value) -> Arc<dyn RemoteObject> {
    match value {
        Value::Ref(object) => object,
        other => panic!("expected a reference, got {:?}", other),
    }
}

#[tokio::test]
async fn hello_world_through_proxy() {
    let pair = Pair::connect().await.unwrap();
    let greeter = pair.lookup(GREETER).await.unwrap();

    assert!(greeter.remote_handle().is_some());
    assert_eq!(call(&greeter, "getGreeting", vec![]).await, Value::from("Hello World"));
    pair.close();
}

#[tokio::test]
async fn lookup_of_unpublished_interface_is_none() {
    let pair = Pair::connect().await.unwrap();
    let missing = pair.client.lookup("server", "demo.Nothing").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn methods_with_any_number_of_params() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(N_PARAMS).await.unwrap();

    assert_eq!(
        call(&service, "methodWithZeroParams", vec![]).await,
        Value::from("methodWithZeroParams")
    );
    assert_eq!(
        call(&service, "methodWithOneParams", vec![Value::from("First")]).await,
        Value::from("methodWithOneParams:First")
    );
    assert_eq!(
        call(
            &service,
            "methodWithThreeParams",
            vec![Value::from("First"), Value::from("Second"), Value::from("Third")]
        )
        .await,
        Value::from("methodWithThreeParams:First:Second:Third")
    );
}

#[tokio::test]
async fn primitive_and_null_returns() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(RETURN_TYPES).await.unwrap();

    assert_eq!(call(&service, "helloWorld", vec![]).await, Value::from("Hello World"));
    assert_eq!(call(&service, "intReturn", vec![]).await, Value::Int(1810));
    assert_eq!(call(&service, "doubleReturn", vec![]).await, Value::Double(1810.1810));
    assert_eq!(call(&service, "booleanReturn", vec![]).await, Value::Bool(true));
    assert_eq!(call(&service, "stringReturn", vec![]).await, Value::from("1810"));
    assert_eq!(call(&service, "nullReturn", vec![]).await, Value::Null);
    assert_eq!(call(&service, "voidReturn", vec![]).await, Value::Null);
}

#[tokio::test]
async fn exported_return_arrives_as_proxy() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(RETURN_TYPES).await.unwrap();

    let bean = BeanRef(reference(call(&service, "ibeanReturn", vec![]).await));
    assert!(bean.0.remote_handle().is_some());
    assert_eq!(bean.get_name().await.unwrap().as_deref(), Some("JMSLite"));
    assert_eq!(bean.get_age().await.unwrap(), 2);
    assert_eq!(bean.get_title().await.unwrap().as_deref(), Some("Software"));
    assert_eq!(bean.no_setter_getter().await.unwrap().as_deref(), Some("NoSetterGetter"));

    bean.set_name("Renamed").await.unwrap();
    assert_eq!(bean.get_name().await.unwrap().as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn plain_return_arrives_by_value() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(RETURN_TYPES).await.unwrap();

    let value = call(&service, "beanReturn", vec![]).await;
    let bean = value.downcast_object::<Bean>().expect("a by-value Bean");
    let state = bean.state();
    assert_eq!(state.name.as_deref(), Some("JMSLite"));
    assert_eq!(state.age, 2);
    assert_eq!(state.title.as_deref(), Some("Software"));
    assert_eq!(state.no_setter_getter, None);
}

#[tokio::test]
async fn remote_exception_keeps_kind_and_message() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(RETURN_TYPES).await.unwrap();

    let err = invoke_by_name(service.as_ref(), "throwsException", vec![])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RpcError::Remote {
            kind: "IllegalAccessException".into(),
            message: "We do not expect this function to return a value".into(),
        }
    );
}

#[tokio::test]
async fn unconstructible_return_type_is_an_error() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(RETURN_TYPES).await.unwrap();

    let err = invoke_by_name(service.as_ref(), "getBeanWithoutDefaultConstructor", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(kinds::READ_ERROR));
    assert!(err.to_string().contains("demo.BeanWithoutDefault"));

    // The client is still usable afterwards.
    assert_eq!(call(&service, "intReturn", vec![]).await, Value::Int(1810));
}

#[tokio::test]
async fn scalar_and_null_params() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(PARAM_TYPES).await.unwrap();
    let bean_server = BeanServerRef(reference(call(&service, "getIBeanServer", vec![]).await));

    let cases = [
        ("booleanParam", Value::Bool(true), "Boolean:true"),
        ("doubleParam", Value::Double(1180.101), "Double:1180.101"),
        ("integerParam", Value::Int(1180), "Integer:1180"),
        ("stringParam", Value::from("String Param"), "String:String Param"),
        ("nullParam", Value::Null, "Null Param"),
        ("nullParam", Value::from("x"), "Not Null"),
    ];
    for (method, arg, expected) in cases {
        let result = bean_server.string_call(method, vec![arg]).await.unwrap();
        assert_eq!(result.as_deref(), Some(expected), "{}", method);
    }

    let err = bean_server
        .call("integerParam", vec![Value::Null])
        .await
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(kinds::METHOD_NOT_FOUND));
}

#[tokio::test]
async fn by_value_param_and_return() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(PARAM_TYPES).await.unwrap();

    let by_value = call(&service, "getBeanServer", vec![]).await;
    assert!(by_value.downcast_object::<BeanServer>().is_some());

    let bean_server = BeanServerRef(reference(call(&service, "getIBeanServer", vec![]).await));
    let field = bean_server
        .bean_param(BeanServer::with_field(Some("Carried".into())))
        .await
        .unwrap();
    assert_eq!(field.as_deref(), Some("Carried"));
}

#[tokio::test]
async fn exported_param_is_called_back() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(PARAM_TYPES).await.unwrap();
    let bean_server = BeanServerRef(reference(call(&service, "getIBeanServer", vec![]).await));

    let local: Arc<dyn RemoteObject> = Arc::new(BeanServer::with_field(Some("Callback".into())));
    let returned = bean_server.ibean_param(Arc::clone(&local)).await.unwrap();

    assert!(returned.0.remote_handle().is_some());
    let field = returned.string_call("getSomeField", vec![]).await.unwrap();
    assert_eq!(field.as_deref(), Some("Callback"));

    // The server drops its proxy to our object once the call is done.
    let table = Arc::clone(pair.client.table());
    assert!(eventually(|| table.is_empty()).await);
}

#[tokio::test]
async fn remote_object_identity_is_stable() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(REMOTE_OBJECTS).await.unwrap();

    let first = reference(call(&service, "ibeanReturn", vec![]).await);
    let second = reference(call(&service, "ibeanReturn", vec![]).await);
    assert_eq!(first.remote_handle(), second.remote_handle());

    let handle = first.remote_handle().cloned().unwrap();
    assert_eq!(pair.server.table().retain_count(&handle), 2);

    let echoed = BeanRef(reference(
        call(&service, "getMeBackTheRemote", vec![Value::Ref(Arc::clone(&first))]).await,
    ));
    assert_eq!(echoed.get_name().await.unwrap().as_deref(), Some("JMSLite"));

    BeanRef(first).set_name("Shared").await.unwrap();
    assert_eq!(pair.remote_objects.bean().state().name.as_deref(), Some("Shared"));
}

#[tokio::test]
async fn released_handle_raises_object_not_found() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(RETURN_TYPES).await.unwrap();
    let bean = reference(call(&service, "ibeanReturn", vec![]).await);
    let handle = bean.remote_handle().cloned().unwrap();

    assert!(pair.client.client().release(&handle).await.unwrap());
    let err = invoke_by_name(bean.as_ref(), "getName", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(kinds::OBJECT_NOT_FOUND));
}

#[tokio::test]
async fn dropped_proxy_is_released() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(RETURN_TYPES).await.unwrap();
    let baseline = pair.server.table().len();

    let bean = reference(call(&service, "ibeanReturn", vec![]).await);
    assert_eq!(pair.server.table().len(), baseline + 1);
    drop(bean);

    let table = Arc::clone(pair.server.table());
    assert!(eventually(|| table.len() == baseline).await);
}

#[tokio::test]
async fn published_handles_survive_lookups_being_dropped() {
    let pair = Pair::connect().await.unwrap();
    let greeter_handle = pair.published[0].clone();

    let greeter = pair.lookup(GREETER).await.unwrap();
    assert_eq!(pair.server.table().retain_count(&greeter_handle), 2);
    drop(greeter);

    let table = Arc::clone(pair.server.table());
    assert!(eventually(|| table.retain_count(&greeter_handle) == 1).await);

    let greeter = pair.lookup(GREETER).await.unwrap();
    assert_eq!(call(&greeter, "getGreeting", vec![]).await, Value::from("Hello World"));
}

#[tokio::test]
async fn concurrent_calls_are_correlated() {
    let pair = Pair::connect().await.unwrap();
    let service = pair.lookup(N_PARAMS).await.unwrap();

    let calls = (0..32).map(|i| {
        let service = Arc::clone(&service);
        async move {
            let arg = format!("call-{}", i);
            let result = invoke_by_name(service.as_ref(), "methodWithOneParams", vec![Value::from(arg.as_str())])
                .await
                .unwrap();
            (arg, result)
        }
    });
    for (arg, result) in futures::future::join_all(calls).await {
        assert_eq!(result, Value::from(format!("methodWithOneParams:{}", arg)));
    }
}
