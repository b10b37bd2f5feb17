// Build script for user-service
// Compiles user_service.proto; client code is used by integration tests
fn main() {
    println!("cargo:rerun-if-changed=../proto/services/user_service.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &["../proto/services/user_service.proto"],
            &["../proto/services"],
        )
        .expect("Failed to compile user_service.proto for user-service");
}
