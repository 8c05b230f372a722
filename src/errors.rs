//! The error hierarchy shared by the client and worker binaries.
//!
//! Every kind named in the compile-task protocol has a variant here. Client
//! code treats any of them but `ChildFailure` as fatal; worker code catches
//! every one of them but `PayloadDecode` at the task-handler boundary and
//! turns it into a response instead of letting it propagate to the broker.

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Json(::serde_json::Error);
        Yaml(::serde_yaml::Error);
        Redis(::redis::RedisError);
    }

    errors {
        /// The dialect name on a request or the `compiler` config key is not
        /// one of the recognised values (`gcc`, `msvc`).
        UnknownCompiler(name: String) {
            description("unknown compiler dialect")
            display("unknown compiler dialect: '{}'", name)
        }

        /// The request's tag has no matching entry in the worker's tool table.
        UnknownTool(tag: String) {
            description("no tool registered for tag")
            display("no tool registered for tag '{}'", tag)
        }

        /// Temporary directory creation, directory creation, file write, or
        /// chmod failed while materialising the sandbox.
        SandboxSetup(msg: String) {
            description("sandbox setup failed")
            display("sandbox setup failed: {}", msg)
        }

        /// Pipe creation or process spawn failed.
        SpawnFailure(msg: String) {
            description("failed to spawn compiler")
            display("failed to spawn compiler: {}", msg)
        }

        /// The request payload could not be decoded. This is the only kind
        /// allowed to propagate to the broker as a non-retryable delivery
        /// failure; every other kind is turned into a response.
        PayloadDecode(msg: String) {
            description("could not decode task payload")
            display("could not decode task payload: {}", msg)
        }

        /// The client could not enqueue a request or poll for its result.
        BrokerUnavailable(msg: String) {
            description("broker unavailable")
            display("broker unavailable: {}", msg)
        }
    }
}
