use glslt_lang::{Frontend, ParserOptions, Root, RootSupplier, Shape};

fn main() {
    divan::main();
}

fn shader(functions: usize) -> String {
    (0..functions)
        .map(|i| {
            format!(
                "uniform vec3 color{i};\nfloat shade{i}(vec3 n, float k) {{\n  float d = dot(n, color{i}) * k;\n  for (int j = 0; j < 4; j++) {{ d += float(j) * 0.5; }}\n  return d > 1.0 ? 1.0 : d;\n}}\n"
            )
        })
        .collect()
}

#[divan::bench(args = [10, 100])]
fn parse_translation_unit(bencher: divan::Bencher, functions: usize) {
    let code = shader(functions);
    let frontend = Frontend::new(ParserOptions::default());

    bencher.bench_local(|| {
        let root = Root::default();
        frontend.parse_translation_unit(&root, &code).unwrap();
        root
    });
}

#[divan::bench(args = [100])]
fn rename_all_by_prefix(bencher: divan::Bencher, functions: usize) {
    let code = shader(functions);
    let frontend = Frontend::new(ParserOptions::default());

    bencher.bench_local(|| {
        let root = RootSupplier::PREFIX.supply();
        frontend.parse_translation_unit(&root, &code).unwrap();
        for node in root.matching_prefix("color").unwrap() {
            let renamed = format!("u_{}", node.name().unwrap_or_default());
            node.set_name(renamed).unwrap();
        }
        root
    });
}

#[divan::bench(args = [100])]
fn clone_tree(bencher: divan::Bencher, functions: usize) {
    let root = Root::default();
    Frontend::default()
        .parse_translation_unit(&root, &shader(functions))
        .unwrap();
    let tree = root.tree().unwrap();

    bencher.bench_local(|| tree.deep_clone().unwrap());
}

#[divan::bench(args = [100])]
fn count_of_type_in_session(bencher: divan::Bencher, functions: usize) {
    let root = Root::default();
    Frontend::default()
        .parse_translation_unit(&root, &shader(functions))
        .unwrap();

    bencher.bench_local(|| {
        root.with_index_session(|| root.count_of_type(Shape::FunctionDefinition))
    });
}
