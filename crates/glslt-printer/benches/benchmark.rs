use glslt_lang::{Frontend, Root};
use glslt_printer::{PrintType, Printer};

fn main() {
    divan::main();
}

const SHADER: &str = r#"#version 330 core
layout(location = 0) in vec3 position;
uniform Block { mat4 mvp; float time; } block;
struct Light { vec3 color; float radius[2]; };
out vec4 color;
void main() {
    vec3 p = position * (1.0 + sin(block.time));
    for (int i = 0; i < 4; i++) {
        if (p.x > 0.5) { p.y -= 0.1; } else p.z += 0.1;
    }
    gl_Position = block.mvp * vec4(p, 1.0);
    color = vec4(p.xyz, 1.0);
}
"#;

fn parsed() -> (Root, glslt_lang::Node) {
    let root = Root::default();
    let tree = Frontend::default()
        .parse_translation_unit(&root, SHADER)
        .unwrap();
    (root, tree)
}

#[divan::bench]
fn print_compact(bencher: divan::Bencher) {
    let (_root, tree) = parsed();
    bencher.bench_local(|| Printer::new(None).print(&tree, PrintType::Compact));
}

#[divan::bench]
fn print_annotated(bencher: divan::Bencher) {
    let (_root, tree) = parsed();
    bencher.bench_local(|| Printer::new(None).print(&tree, PrintType::IndentedAnnotated));
}
