use roll_ngin::{
    config::Settings,
    flow::{self, GameMode},
    roll::RollGame,
};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let scene_file = args.next().unwrap_or_else(|| "level.scene".to_string());
    let mesh_file = args.next().unwrap_or_else(|| "level.pnct".to_string());

    flow::run(Box::new(move |mut ctx| {
        Box::pin(async move {
            let game = RollGame::load(&mut ctx, &scene_file, &mesh_file, Settings::default()).await?;
            Ok((ctx, Box::new(game) as Box<dyn GameMode>))
        })
    }))
}
