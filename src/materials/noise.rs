use regex::RegexSet;
use tracing::debug;

use crate::models::MaterialItem;

/// Promotional boilerplate that marks a snippet as noise
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    // purchase prompts
    r"(?i)\bbuy now\b",
    r"(?i)\border (now|today)\b",
    r"(?i)\blimited[- ]time (offer|deal|discount)\b",
    r"(?i)\b(coupon|promo|discount) code\b",
    // franchise and reseller pitches
    r"(?i)\bfranchise (opportunity|partners?)\b",
    r"(?i)\bbecome (a|our) (reseller|distributor|agent)\b",
    // traffic funnels
    r"(?i)\bscan the qr code\b",
    r"(?i)\badd (me|us) on wechat\b",
    r"(?i)\bwechat( id)?\s*[:：]?\s*\d{5,}",
    r"(?i)\bfollow (our|the) official account\b",
    r"(?i)\bclick (the link|here) (to|for)\b",
    r"(?i)\b(claim|get) your free\b",
    // urgency talk
    r"(?i)\bonly \d+ (spots|places|seats) left\b",
    r"(?i)\bdon'?t miss out\b",
    r"(?i)\blast chance\b",
    // Chinese-language equivalents
    r"点击购买|立即下单|立即购买|马上下单|限时优惠|限时特价|优惠券|满减",
    r"加盟|招商|合作伙伴招募",
    r"扫码|添加微信|私信|关注公众号",
    r"(?i)微信号?[:：]?\s*\d{5,}",
    r"(?i)QQ号?[:：]?\s*\d{5,}",
    r"领取.*红包|免费领|0元领",
    r"点击链接|复制.*淘宝|下单.*优惠|戳.*链接|点击.*详情|查看.*原文",
    r"错过.*后悔|名额有限|仅限今天|最后.*机会|手慢无",
];

/// Compiled noise denylist
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    patterns: RegexSet,
}

impl NoiseFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn is_noise(&self, text: &str) -> bool {
        self.patterns.is_match(text)
    }

    /// Split items into (kept, dropped count)
    pub fn apply(&self, items: Vec<MaterialItem>) -> (Vec<MaterialItem>, usize) {
        let before = items.len();
        let kept: Vec<MaterialItem> = items
            .into_iter()
            .filter(|item| match item.text() {
                Some(text) if self.is_noise(text) => {
                    debug!("Dropping promotional material {}", item.id);
                    false
                }
                _ => true,
            })
            .collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile_and_match() {
        let filter = NoiseFilter::new(DEFAULT_NOISE_PATTERNS).unwrap();

        assert!(filter.is_noise("Limited-time offer! Buy now before it's gone"));
        assert!(filter.is_noise("Add us on WeChat for the full list"));
        assert!(filter.is_noise("WeChat: 1234567"));
        assert!(filter.is_noise("扫码领取绘本清单"));
        assert!(filter.is_noise("满减活动今晚结束"));
        assert!(!filter.is_noise(
            "We read the first chapter aloud and the children predicted the ending."
        ));
    }

    #[test]
    fn test_empty_denylist_keeps_everything() {
        let filter = NoiseFilter::new(Vec::<String>::new()).unwrap();
        assert!(!filter.is_noise("buy now"));
    }

    #[test]
    fn test_chinese_traffic_funnels_and_urgency() {
        let filter = NoiseFilter::new(DEFAULT_NOISE_PATTERNS).unwrap();

        for spam in [
            "马上下单，送绘本一套",
            "有问题请私信老师",
            "加QQ：12345678 进群",
            "qq号 987654321",
            "领取新人红包",
            "点击链接查看书单",
            "复制这段话打开淘宝",
            "戳下方链接报名",
            "错过今天你会后悔",
            "这是最后一次机会",
        ] {
            assert!(filter.is_noise(spam), "not flagged: {}", spam);
        }

        // Agency wording alone is common in real classroom notes
        assert!(!filter.is_noise("老师代理班主任的那一周，我们每天读十分钟"));
        assert!(!filter.is_noise("QQ空间里的读书日记"));
    }
}
