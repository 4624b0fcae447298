//! The theme catalog: a static, ordered table of discussion themes.

use ito_protocol::{Theme, ThemeId};
use rand::Rng;

/// An ordered table of themes with ids `1..=len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeCatalog {
    themes: Vec<Theme>,
}

impl ThemeCatalog {
    /// Builds a catalog from `(title, min, max)` entries, numbering them
    /// from 1 in order.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: Into<String>,
    {
        let themes = entries
            .into_iter()
            .zip(1..)
            .map(|((title, min, max), id)| Theme {
                id,
                title: title.into(),
                min: min.into(),
                max: max.into(),
            })
            .collect();
        Self { themes }
    }

    /// The built-in 120-theme Portuguese catalog.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN.iter().copied())
    }

    /// Number of themes; also the highest valid id.
    pub fn len(&self) -> u32 {
        self.themes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Exact lookup by id.
    pub fn get(&self, id: ThemeId) -> Option<&Theme> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.themes.get(index)
    }

    /// Returns `true` if `number` names a theme.
    pub fn contains(&self, number: u32) -> bool {
        (1..=self.len()).contains(&number)
    }

    /// A contiguous run of `2 * radius + 1` themes centered on `number`.
    ///
    /// Near either end the window is shifted (not shrunk) to stay inside
    /// `1..=len`; it only shrinks when the catalog itself is smaller.
    pub fn around(&self, number: u32, radius: u32) -> Vec<Theme> {
        let len = i64::from(self.len());
        if len == 0 {
            return Vec::new();
        }
        let (number, radius) = (i64::from(number), i64::from(radius));
        let mut start = number - radius;
        let mut end = number + radius;
        if start < 1 {
            start = 1;
            end = (1 + radius * 2).min(len);
        }
        if end > len {
            end = len;
            start = (len - radius * 2).max(1);
        }
        (start..=end)
            .filter_map(|id| u32::try_from(id).ok())
            .filter_map(|id| self.get(id).cloned())
            .collect()
    }

    /// A uniformly random theme number in `1..=len`.
    pub fn random_number(&self, rng: &mut impl Rng) -> u32 {
        rng.random_range(1..=self.len().max(1))
    }
}


const BUILTIN: &[(&str, &str, &str)] = &[
    ("Mangá / anime famoso", "desconhecido", "famoso"),
    ("Pessoas famosas que você gostaria de ser", "não gostaria de ser", "gostaria de ser"),
    ("Coisas que te dão medo", "nem um sustinho", "morreria de medo"),
    ("Coisas que você não conseguiria perdoar", "nada demais", "imperdoável"),
    ("Mentiras que você acreditaria", "não acreditaria", "acreditaria com certeza"),
    ("Esportes mais conhecidos", "pouca gente conhece", "muito popular"),
    ("Lugares onde você gostaria de morar", "não ficaria lá 5 minutos", "passaria lá a eternidade"),
    ("Itens do dia a dia que poderiam ser boas armas", "nem arranha", "arma forte"),
    ("Coisas que você ficaria olhando com admiração o dia inteiro", "nem pararia pra olhar", "ficaria olhando por horas"),
    ("Habilidades importantes para ser líder", "não importante", "essencial"),
    ("Contos de fadas populares", "desconhecido", "popular"),
    ("Poderes especiais que você gostaria de ter", "não gostaria", "gostaria"),
    ("Coisas que te fazem feliz", "não te faz feliz", "felicidade pura"),
    ("Atletas famosos", "sei nem quem é", "grande campeão"),
    ("Personagens da ficção que você gostaria de ser", "não seria", "seria muito"),
    ("Personagens da ficção com quem você gostaria de ter um encontro", "não valeria um encontro", "provavelmente casaria"),
    ("Filmes conhecidos", "ninguém viu", "todo mundo assistiu"),
    ("Coisas nas quais você gostaria de ficar em imersão", "não, obrigado", "quero uma piscina cheia disso"),
    ("Sabores de sorvete que poderiam ser deliciosos", "credo, horrível!", "comeria toneladas"),
    ("Itens / armas que você gostaria de ter para lutar contra zumbis", "é pra fazer cosquinha?", "adiós, zumbi!"),
    ("Atletas famosos", "sei nem quem é", "grande campeão"),
    ("Personagens da ficção que você gostaria de ser", "não seria", "seria muito"),
    ("Coisas que cheiram bem", "cheiro normal", "faria um perfume disso"),
    ("Coisas que você gostaria de fazer quando se aposentar", "não faria", "faria com toda certeza"),
    ("Coisas importantes para fazer sucesso nas mídias sociais", "pouco importante", "obrigatório"),
    ("Comidas famosas", "pouca gente conhece", "encontradas em todo o mundo"),
    ("Celebridades de filmes e séries mais conhecidas da atualidade", "fez poucas participações", "está sempre nos lançamentos"),
    ("Coisas que você gostaria de ter como souvenir", "não teria isso", "teria mais de mil"),
    ("Coisas difíceis de suportar", "não tão difícil", "praticamente impossível"),
    ("Habilidades essenciais para um comediante", "desnecessária", "obrigatória"),
    ("Coisas pesadas", "levinho", "pesado"),
    ("Figuras históricas populares", "sei nem quem é", "figura importante"),
    ("Coisas que você desejava quando criança", "nem queria", "queria pra caramba"),
    ("Coisas úteis em uma casa", "inútil", "muito útil"),
    ("Coisas que fazem você se sentir amado(a)", "não faz", "é puro amor"),
    ("Canções famosas", "ninguém conhece", "todo mundo canta junto"),
    ("Marcas mais valiosas", "vale pouco", "vale bilhões"),
    ("Coisas que você quer fazer logo quando acorda", "não quero fazer", "quero muito"),
    ("Sons que te fazem feliz", "nem é som", "felicidade para os ouvidos"),
    ("Pense como um estudante do ensino médio: o que é legal?", "cringe", "super legal"),
    ("Presentes de aniversário mais comuns", "ninguém ganha", "todo mundo já ganhou"),
    ("Países populares para viajar", "ninguém vai", "todo mundo já foi"),
    ("Coisas que te fazem feliz quando feitas pelo seu amor", "pouco feliz", "muito feliz"),
    ("Animais nos quais você gostaria de montar", "não gostaria", "queria demais"),
    ("Pense como uma criança: o que te faz feliz?", "não te faz muito feliz", "isso sim é felicidade"),
    ("Vilões mais temíveis", "até eu encarava", "me faz ter pesadelos"),
    ("Coisas fofinhas", "pouco fofinho", "um cuti-cuti"),
    ("Atividades difíceis de serem feitas sozinho(a)", "dá pra fazer", "impossível"),
    ("Habilidades úteis para o trabalho", "inútil", "muito útil"),
    ("Pense como um gato: os lugares mais confortáveis do mundo", "pouco confortável", "muito confortável"),
    ("Tamanho de animais", "pequeno", "enorme"),
    ("Coisas leves", "pouco leve", "levíssimo"),
    ("Frases estranhas se ditas por uma criança de 5 anos", "normal", "muito estranho"),
    ("Algo que te surpreenderia se fosse achado embaixo de uma pedra no parque", "algo comum", "algo surpreendente"),
    ("Coisas confiáveis por todo o sempre", "pouco confiável", "confiável eternamente"),
    ("Lugares onde você vai com frequência", "vai pouco", "vai muito"),
    ("Drinques populares", "ninguém bebe isso", "todo mundo já bebeu"),
    ("Pedidos de casamento que te fariam feliz", "aquele de passar vergonha", "algo memorável"),
    ("Itens encontrados em um baú do tesouro que você gostaria de ter", "não gostaria", "queria muito"),
    ("Tipos de festivais que você gostaria de participar", "não iria nem pagando", "gastaria o salário pra ir"),
    ("Brinquedos mais conhecidos", "desconhecido", "toda criança já teve um"),
    ("Coisas que te deixam com sono", "acordadíssimo", "zzzzz…"),
    ("Itens úteis quando você está perdido(a) no deserto", "não serve para nada", "salvaria sua vida"),
    ("Momentos históricos que você visitaria se tivesse uma máquina do tempo", "fuja, louco!", "iria agora"),
    ("Pense como um vilão: qual seria o personagem heróico que você menos gostaria de enfrentar?", "derrotaria facilmente", "tenho medo até da sombra"),
    ("Palavras que você gostaria de ouvir", "praticamente uma ofensa", "mais que um elogio"),
    ("Veículos mais comuns", "nunca vi", "tem um em cada esquina"),
    ("Coisas que te surpreenderiam se saíssem do seu corpo", "normal", "não dá pra imaginar isso"),
    ("Alimentos que fazem bem", "nada saudável", "puro suco de saúde"),
    ("Pense como um cientista: o que você gostaria de descobrir?", "não gostaria de descobrir", "merece um Nobel"),
    ("Itens úteis para levar a uma ilha deserta", "inútil", "muito útil"),
    ("Piadas mais engraçadas", "isso é ofensivo", "ri litros"),
    ("Melhores nomes de golpes especiais para gritar", "não botou medo", "isso sim impõe respeito"),
    ("Títulos de livros que te deixariam curioso para saber seu conteúdo", "ninguém se importa", "vou comprar"),
    ("Pense como um cachorro: o que te faz feliz?", "nada AU-AUdacioso", "de balançar a cauda"),
    ("Melhores jogos de tabuleiro já lançados", "aquele que flopou muito", "digno de um prêmio Spiel"),
    ("Itens diferentões que você gostaria de ter", "nem tanto", "isso é muito legal"),
    ("Características de pessoas que você gostaria de ter em seu círculo de amizade", "nada interessante", "BFF na certa"),
    ("Pense como um mago: qual seria o seu feitiço favorito?", "feitiço comum", "usaria toda hora"),
    ("Coisas que surpreenderiam se fossem ditas por um professor", "faz parte da aula", "por essa ninguém esperava"),
    ("As coisas mais bonitas do mundo", "ok", "visão do paraíso"),
    ("Os doces mais conhecidos", "nunca vi, nem comi, só ouço falar", "vende em todo lugar"),
    ("Amor verdadeiro ou apenas uma aventura?", "aventura", "amor verdadeiro"),
    ("Pense como um herói: qual seria sua pose? (demonstre-a)", "lamentável", "épica"),
    ("Mundos imaginários que você gostaria de visitar", "não gostaria", "viveria lá o resto da vida"),
    ("Coisas populares com crianças", "pouco conhecida", "muito famosa"),
    ("Os nomes mais legais", "muito comum", "meu filho vai ter"),
    ("Coisas que você faz quando está de bom humor", "nunca faço", "faço muito"),
    ("Pense como um explorador: que lugares te deixam animado?", "um desânimo só", "bora lá, agora?"),
    ("Habilidades úteis em relacionamentos", "inútil", "essencial"),
    ("Personagens mais fortes da ficção", "fraco demais", "indestrutível"),
    ("Lugares onde mais acontecem encontros românticos", "poucos encontros", "está acontecendo um agora"),
    ("Um único prato pra comer até o fim da vida", "não escolheria", "comeria agora, inclusive"),
    ("Pense como um adolescente: o que seria algo ruim se acontecesse durante a aula?", "nem tão ruim", "que vergonha!"),
    ("Personagens fictícios com os piores temperamentos", "de boas", "explosivo"),
    ("Coisas que você ficaria feliz em encontrar no seu bolso ou bolsa", "nada feliz", "alegria pura"),
    ("Caretas engraçadas (faça-as)", "isso é ridículo", "muito engraçado!"),
    ("Ações e atitudes que exigem coragem", "nada corajoso", "pura coragem"),
    ("Se você tivesse um alter ego, o que gostaria que ele fosse?", "não gostaria", "é meu tipo"),
    ("Habilidades importantes para um streamer", "desnecessária", "obrigatória"),
    ("Músicas para cantar no karaokê", "ninguém conhece", "todo mundo canta junto"),
    ("Coisas que você faria por 1 milhão de reais", "nem por 10 milhões", "faria de graça"),
    ("Profissões mais estressantes", "relaxante", "infarto garantido"),
    ("Comidas para comer às 3h da manhã", "nem pensar", "perfeito pra madrugada"),
    ("Coisas que você compraria se ganhasse na loteria", "não compraria", "primeira coisa da lista"),
    ("Desculpas para não ir trabalhar", "ninguém acredita", "desculpa perfeita"),
    ("Coisas que te irritam no trânsito", "nem ligo", "dá vontade de buzinar"),
    ("Séries para maratonar", "desisti no piloto", "viciei completamente"),
    ("Coisas constrangedoras de fazer em público", "normal", "morreria de vergonha"),
    ("Melhores lugares para um primeiro encontro", "péssima ideia", "lugar perfeito"),
    ("Coisas que você esconderia dos seus pais", "contaria tranquilo", "segredo eterno"),
    ("Animais mais perigosos", "inofensivo", "fuja imediatamente"),
    ("Piores coisas para pisar descalço", "de boa", "dor insuportável"),
    ("Coisas que você faz quando ninguém está olhando", "faço na frente de todos", "segredo absoluto"),
    ("Melhores férias possíveis", "prefiro trabalhar", "férias dos sonhos"),
    ("Coisas mais satisfatórias", "tanto faz", "satisfação pura"),
    ("Piores coisas para esquecer", "sem problema", "catástrofe total"),
    ("Jogos de videogame mais viciantes", "larguei rápido", "perdi noites de sono"),
    ("Coisas que te fazem sentir velho(a)", "ainda sou jovem", "me senti um dinossauro"),
    ("Superpoderes mais úteis no dia a dia", "inútil", "resolveria minha vida"),
];
