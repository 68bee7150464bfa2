use std::sync::{Arc, Mutex};

use futures::executor::block_on;
use modi_config::{config::Config, provider::ConfigProvider};
use modi_di::{App, Consumer, ConsumerContext, Module, ResolveError};

struct ServerConfig {
    port: u16,
}

#[test]
fn one_config_provider_is_shared_by_all_modules() {
    let mut configs = ConfigProvider::initialize();
    configs.add_config(ServerConfig { port: 8080 }).unwrap();

    let ports = Arc::new(Mutex::new(Vec::new()));
    let reader = |name: &str| {
        let ports = ports.clone();
        Consumer::controller(name)
            .dep("server", &configs.provider::<ServerConfig>().unwrap())
            .build(move |ctx: ConsumerContext| {
                let ports = ports.clone();
                async move {
                    let config = Config::<ServerConfig>::from_deps(&ctx.deps, "server")?;
                    ports.lock().unwrap().push(config.port);
                    Ok::<_, ResolveError>(())
                }
            })
    };

    let root = Module::builder("root")
        .consumer(reader("http"))
        .sub_module(Module::builder("admin").consumer(reader("admin")).build())
        .build();

    block_on(App::builder(root).build()).unwrap();
    assert_eq!(*ports.lock().unwrap(), vec![8080, 8080]);
}
