//! Translation throughput over a branchy loop kernel.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nvlift_engine::bytecode::{Instruction, Method, Opcode, Operand, Program, SourceType};
use nvlift_engine::Engine;

/// `while (v != 4) v++;` over local 0, seeded from the argument.
fn countdown_kernel() -> Program {
    let ops: Vec<(Opcode, Operand)> = vec![
        (Opcode::Ldarg, Operand::Int(0)),
        (Opcode::Stloc, Operand::Int(0)),
        (Opcode::Br, Operand::Target(4)), // → test at 7
        (Opcode::Ldloc, Operand::Int(0)),
        (Opcode::LdcI4, Operand::Int(1)),
        (Opcode::Add, Operand::None),
        (Opcode::Stloc, Operand::Int(0)),
        (Opcode::Ldloc, Operand::Int(0)), // test
        (Opcode::LdcI4, Operand::Int(4)),
        (Opcode::BneUn, Operand::Target(-7)), // → body at 3
        (Opcode::Ret, Operand::None),
    ];
    let mut method = Method::new("countup", vec![SourceType::I32], SourceType::Void);
    method.local_count = 1;
    method.kernel = true;
    method.body = ops
        .into_iter()
        .enumerate()
        .map(|(i, (opcode, operand))| Instruction::new(i as u32, opcode, operand))
        .collect();

    let mut program = Program::new();
    program.add_method(method);
    program
}

fn bench_translate(c: &mut Criterion) {
    let program = countdown_kernel();
    let entries = program.kernel_methods();
    let engine = Engine::new();

    c.bench_function("translate_loop_kernel", |b| {
        b.iter(|| {
            let module = engine.translate(black_box(&program), black_box(&entries)).unwrap();
            black_box(module)
        })
    });
}

criterion_group!(benches, bench_translate);
criterion_main!(benches);
