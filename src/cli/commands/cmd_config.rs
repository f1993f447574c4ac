use crate::cli::Context;

pub async fn execute(ctx: &Context<'_>) {
    ctx.settings.print_config();
}
