fn main() {
    // Configurar la ruta de búsqueda para ONNX Runtime.
    // Solo emitir las directivas de enlace si el directorio vendorizado
    // existe; de lo contrario `ort` carga la librería dinámicamente en
    // tiempo de ejecución (feature `load-dynamic`) y no hay nada que enlazar.
    let vendored = "onnxruntime-linux-x64-1.22.0/lib";
    if std::path::Path::new(vendored).is_dir() {
        println!("cargo:rustc-link-search=native={vendored}");
        println!("cargo:rustc-link-lib=dylib=onnxruntime");
    }

    // Recompilar si cambia el directorio de ONNX Runtime
    println!("cargo:rerun-if-changed=onnxruntime-linux-x64-1.22.0/");
}
