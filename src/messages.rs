//! User-visible reply copy, rendered with `{{key}}` placeholders.

pub const GENERATE_ACCEPTED: &str =
    "🚀你的作品将在1~2分钟左右完成，请耐心等待\n- - - - - - - - -\n";
pub const PROMPT_REWRITTEN: &str = "初始prompt: {{prompt}}\n转换后prompt: {{real_prompt}}";
pub const PROMPT_ONLY: &str = "prompt: {{prompt}}";
pub const GENERATE_FAILED: &str = "图片生成失败，请稍后再试";
pub const UPSCALE_ACCEPTED: &str = "🔎图片正在放大中，请耐心等待";
pub const INVALID_IMAGE_ID: &str = "请输入正确的图片ID";
pub const MISSING_PARAMETERS: &str = "{{cmd}} 命令缺少参数";
pub const INDEX_OUT_OF_RANGE: &str = "图片序号 {{index}} 错误，应在 1 至 4 之间";
pub const ALREADY_UPSCALED: &str = "第 {{index}} 张图片已经放大过了";
pub const UNSUPPORTED_COMMAND: &str = "暂不支持该命令";
pub const POLL_EXHAUSTED: &str = "任务 {{task_id}} 等待超时，请稍后重试";

pub const GENERATE_FINISHED: &str = "🎨绘画完成!\nprompt: {{prompt}}\n- - - - - - - - -\n图片ID: {{img_id}}\n\n🔎可使用 {{prefix}}mju 命令放大指定图片\n例如：\n{{prefix}}mju {{img_id}} 1";

pub const HELP_SHORT: &str = "利用midjourney来画图。\n";
pub const HELP_VERBOSE: &str = "{{prefix}}mj 描述词1,描述词2 ... ： 利用描述词作画，参数请放在提示词之后。\n{{prefix}}mjimage 描述词1,描述词2 ... ： 利用描述词进行图生图，参数请放在提示词之后。\n{{prefix}}mjr ID: 对指定ID消息重新生成图片。\n{{prefix}}mju ID 图片序号: 对指定ID消息中的第x张图片进行放大。\n{{prefix}}mjv ID 图片序号: 对指定ID消息中的第x张图片进行变换。\n例如：\n\"{{prefix}}mj a little cat, white --ar 9:16\"\n\"{{prefix}}mjimage a white cat --ar 9:16\"\n\"{{prefix}}mju 1105592717188272288 2\"";

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
